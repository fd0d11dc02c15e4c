//! # av-capture-core
//!
//! Audio capture synchronized to a video stream.
//!
//! Hardware blocks are accumulated into encoder-sized frames, stamped on
//! the video timeline and handed to the encoder through a fixed-capacity
//! ring. Transports (cpal, the synthetic generator) implement the
//! `CaptureBackend` trait and plug into the generic `AudioCaptureSession`.
//!
//! ## Architecture
//!
//! ```text
//! av-capture-core (this crate)
//! ├── traits/       ← CaptureBackend, BlockSink, VideoClock, EncoderFrameInfo, CaptureDelegate
//! ├── models/       ← CaptureError, CaptureState, CaptureConfiguration, ResolvedFormat, SessionReport
//! ├── processing/   ← RingBuffer, ClockSync, SampleFormatConverter
//! ├── session/      ← AudioCaptureSession, CaptureCallback, SessionHandle, VideoLink
//! ├── backend/      ← SyntheticBackend
//! └── timebase      ← MonotonicClock
//! ```

pub mod backend;
pub mod models;
pub mod processing;
pub mod session;
pub mod timebase;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use backend::synthetic::SyntheticBackend;
pub use models::audio_models::{
    AudioFrame, AudioSource, AudioTransportType, CaptureSessionDiagnostics, DeviceDefaults, Pcm16Frame,
    ResolvedFormat,
};
pub use models::config::{AudioCodec, CaptureConfiguration, FrameRate, VideoCodec, PCM_FRAME_SIZE};
pub use models::error::CaptureError;
pub use models::session_report::SessionReport;
pub use models::state::CaptureState;
pub use processing::clock_sync::ClockSync;
pub use processing::ring_buffer::{RingBuffer, RingError};
pub use processing::sample_format::SampleFormatConverter;
pub use session::capture_session::{AudioCaptureSession, AUDIO_RING_SLOTS};
pub use session::handle::{FrameConsumer, SessionHandle};
pub use session::video_link::VideoLink;
pub use timebase::MonotonicClock;
pub use traits::capture_backend::{BlockSink, CaptureBackend, StreamControl, StreamParams};
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::encoder::{EncoderFrameInfo, FixedEncoderInfo};
pub use traits::video_clock::VideoClock;
