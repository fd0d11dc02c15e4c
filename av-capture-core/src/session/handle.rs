use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioFrame, CaptureSessionDiagnostics, Pcm16Frame, ResolvedFormat};
use crate::processing::sample_format::SampleFormatConverter;
use crate::session::state::SessionState;

/// Cross-thread view of a capture session.
///
/// Handed to the encoder/muxer thread (to drain frames) and to the video
/// path (to count down skipped frames). Every call takes the session lock
/// briefly; none of them block on audio.
#[derive(Clone)]
pub struct SessionHandle {
    state: Arc<Mutex<SessionState>>,
}

impl SessionHandle {
    pub(crate) fn new(state: Arc<Mutex<SessionState>>) -> Self {
        Self { state }
    }

    /// Take the oldest pending frame, if any.
    pub fn try_consume(&self) -> Option<AudioFrame> {
        self.state.lock().ring.as_mut()?.try_consume()
    }

    /// Lend the oldest pending frame to `f` without copying it. `f` runs
    /// under the session lock and must be quick.
    pub fn consume_with<R>(&self, f: impl FnOnce(&[f32], u64) -> R) -> Option<R> {
        self.state.lock().ring.as_mut()?.consume_with(f)
    }

    /// Frames waiting in the ring (0 when no session is running).
    pub fn pending_frames(&self) -> usize {
        self.state.lock().ring.as_ref().map_or(0, |ring| ring.len())
    }

    pub fn is_streaming(&self) -> bool {
        self.state.lock().streaming
    }

    /// Called by the video path for every frame it discards at start.
    /// Returns the number of frames still to skip.
    pub fn frame_skipped(&self) -> u32 {
        let mut state = self.state.lock();
        state.skip_frames = state.skip_frames.saturating_sub(1);
        state.skip_frames
    }

    pub fn skip_frames(&self) -> u32 {
        self.state.lock().skip_frames
    }

    pub fn format(&self) -> Option<ResolvedFormat> {
        self.state.lock().format
    }

    pub fn diagnostics(&self) -> CaptureSessionDiagnostics {
        self.state.lock().diagnostics.clone()
    }
}

/// Consumer that also converts frames to 16-bit PCM.
pub struct FrameConsumer {
    handle: SessionHandle,
    converter: SampleFormatConverter,
}

impl FrameConsumer {
    pub fn new(handle: SessionHandle) -> Self {
        Self {
            handle,
            converter: SampleFormatConverter::new(),
        }
    }

    pub fn try_consume(&mut self) -> Option<AudioFrame> {
        self.handle.try_consume()
    }

    /// Take the oldest pending frame as signed 16-bit PCM.
    pub fn try_consume_pcm16(&mut self) -> Option<Pcm16Frame> {
        let converter = &mut self.converter;
        self.handle.consume_with(|samples, timestamp_ns| Pcm16Frame {
            samples: converter.float_to_int16(samples).to_vec(),
            timestamp_ns,
        })
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }
}
