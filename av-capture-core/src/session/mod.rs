pub mod callback;
pub mod capture_session;
pub mod handle;
pub(crate) mod state;
pub mod video_link;
