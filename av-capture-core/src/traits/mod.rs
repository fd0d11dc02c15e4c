pub mod capture_backend;
pub mod capture_delegate;
pub mod encoder;
pub mod video_clock;
