use crate::models::audio_models::{CaptureSessionDiagnostics, ResolvedFormat};
use crate::models::error::CaptureError;
use crate::models::state::CaptureState;
use crate::processing::clock_sync::ClockSync;
use crate::processing::ring_buffer::RingBuffer;

/// Mutable session state shared between the lifecycle methods, the
/// real-time callback and consumers. Only touched while holding the
/// session's `parking_lot::Mutex`.
pub(crate) struct SessionState {
    pub(crate) state: CaptureState,
    pub(crate) format: Option<ResolvedFormat>,
    /// Write position inside the accumulation buffer.
    pub(crate) sample_index: usize,
    pub(crate) streaming: bool,
    /// Video frames still being skipped; audio is discarded meanwhile.
    pub(crate) skip_frames: u32,
    pub(crate) capture_active: bool,
    pub(crate) stream_failed: bool,
    pub(crate) clock: ClockSync,
    pub(crate) accumulation: Option<Vec<f32>>,
    pub(crate) ring: Option<RingBuffer>,
    pub(crate) diagnostics: CaptureSessionDiagnostics,
}

impl SessionState {
    pub(crate) fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            format: None,
            sample_index: 0,
            streaming: false,
            skip_frames: 0,
            capture_active: false,
            stream_failed: false,
            clock: ClockSync::new(0, 0, 0, 0),
            accumulation: None,
            ring: None,
            diagnostics: CaptureSessionDiagnostics::default(),
        }
    }

    /// Allocate the accumulation buffer and ring slots for `format` and arm
    /// the producer. Nothing is kept if the ring cannot be built.
    pub(crate) fn allocate(&mut self, format: &ResolvedFormat, ring_slots: usize) -> Result<(), CaptureError> {
        let ring = RingBuffer::new(ring_slots, format.samples_per_frame)?;

        self.ring = Some(ring);
        self.accumulation = Some(vec![0.0; format.samples_per_frame]);
        self.sample_index = 0;
        self.streaming = false;
        self.stream_failed = false;
        self.capture_active = true;
        self.clock = ClockSync::new(
            format.samples_per_frame,
            format.sample_rate,
            format.channels,
            format.output_delay_ns,
        );
        self.diagnostics = CaptureSessionDiagnostics::default();
        Ok(())
    }

    /// Free the buffers and reset delay and clock state.
    pub(crate) fn release(&mut self) {
        self.ring = None;
        self.accumulation = None;
        self.sample_index = 0;
        self.streaming = false;
        self.capture_active = false;
        self.clock.reset();
    }

    pub(crate) fn has_buffers(&self) -> bool {
        self.ring.is_some() || self.accumulation.is_some()
    }
}
