use std::sync::Arc;

use crate::models::audio_models::{AudioSource, DeviceDefaults};
use crate::models::error::CaptureError;
use crate::timebase::MonotonicClock;

/// Value returned from every block callback to steer the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamControl {
    /// Keep delivering blocks.
    Continue,
    /// Stop invoking the callback; the stream has finished.
    Complete,
}

/// Receiver of hardware blocks.
///
/// Called on the backend's real-time thread. Implementations must return
/// promptly: no blocking, no allocation.
pub trait BlockSink: Send + Sync {
    /// Deliver one block.
    ///
    /// - `samples`: interleaved `f32` samples, or `None` for a block the
    ///   backend could not read (treated as silence).
    /// - `frames`: block length in frames.
    /// - `now_ns`: monotonic time at which the block ended.
    fn on_block(&self, samples: Option<&[f32]>, frames: usize, now_ns: u64) -> StreamControl;

    /// The backend hit a runtime error and will not deliver more blocks.
    fn on_stream_error(&self, error: &CaptureError);
}

/// Parameters for opening a stream.
#[derive(Debug, Clone)]
pub struct StreamParams {
    pub device_id: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Preferred block size in frames (None = backend default).
    pub frames_per_block: Option<u32>,
    /// Timebase for the `now_ns` passed to `BlockSink::on_block`.
    pub clock: MonotonicClock,
}

/// Interface for audio transport backends.
///
/// Implemented by:
/// - `SyntheticBackend` (generator thread, this crate)
/// - `CpalBackend` (`av-capture-cpal`)
///
/// Call order: `open` → `start` → (`stop` | `abort`) → `close`. `stop`,
/// `abort` and `close` must be harmless when nothing is open.
pub trait CaptureBackend: Send + Sync {
    /// Short backend name for logs and reports.
    fn name(&self) -> &str;

    /// Whether this backend can currently deliver audio.
    fn is_available(&self) -> bool;

    /// Native parameters of `device_id` (None = default input device).
    fn device_defaults(&self, device_id: Option<&str>) -> Result<DeviceDefaults, CaptureError>;

    /// Input devices this backend can open.
    fn input_devices(&self) -> Result<Vec<AudioSource>, CaptureError>;

    /// Open a stream delivering blocks to `sink`. No blocks flow until `start`.
    fn open(&mut self, params: &StreamParams, sink: Arc<dyn BlockSink>) -> Result<(), CaptureError>;

    fn start(&mut self) -> Result<(), CaptureError>;

    /// Whether the stream is mid-transfer (started and not finished).
    fn is_active(&self) -> bool;

    /// Stop after the block in flight.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Stop immediately, discarding pending audio.
    fn abort(&mut self) -> Result<(), CaptureError>;

    /// Release the stream. After `close` the sink is no longer referenced.
    fn close(&mut self) -> Result<(), CaptureError>;
}

impl<B: CaptureBackend + ?Sized> CaptureBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn device_defaults(&self, device_id: Option<&str>) -> Result<DeviceDefaults, CaptureError> {
        (**self).device_defaults(device_id)
    }

    fn input_devices(&self) -> Result<Vec<AudioSource>, CaptureError> {
        (**self).input_devices()
    }

    fn open(&mut self, params: &StreamParams, sink: Arc<dyn BlockSink>) -> Result<(), CaptureError> {
        (**self).open(params, sink)
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        (**self).start()
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        (**self).stop()
    }

    fn abort(&mut self) -> Result<(), CaptureError> {
        (**self).abort()
    }

    fn close(&mut self) -> Result<(), CaptureError> {
        (**self).close()
    }
}
