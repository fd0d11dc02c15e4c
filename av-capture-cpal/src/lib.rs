//! # av-capture-cpal
//!
//! Hardware backend for av-capture over `cpal` (ALSA, CoreAudio, WASAPI).
//!
//! Provides:
//! - `CpalBackend`: `CaptureBackend` running a cpal input stream on its own thread
//! - `device`: input device enumeration and default format lookup
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use av_capture_core::{AudioCaptureSession, CaptureConfiguration, MonotonicClock, VideoLink};
//! use av_capture_cpal::CpalBackend;
//!
//! let video = Arc::new(VideoLink::new());
//! let mut session = AudioCaptureSession::new(CpalBackend::new(), MonotonicClock::new(), video);
//! session.configure_for_device(CaptureConfiguration::default(), None)?;
//! session.start()?;
//! ```

pub mod cpal_backend;
pub mod device;

pub use cpal_backend::CpalBackend;
