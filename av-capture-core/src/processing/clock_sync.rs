use crate::models::audio_models::frame_duration_ns;

/// Anchor used for the first frame when audio cannot be placed relative to
/// the video start. Non-zero so "unset" stays distinguishable.
pub const UNSYNCED_ANCHOR_NS: u64 = 1;

/// Assigns presentation timestamps to encoder frames.
///
/// The first frame is anchored to the video timeline; every later frame is
/// exactly one frame duration after the previous one. Timestamps are never
/// re-derived from the block clock, so callback jitter does not leak into
/// the output. The block clock is only used to measure drift.
#[derive(Debug, Clone)]
pub struct ClockSync {
    frame_duration_ns: u64,
    output_delay_ns: u64,
    capture_begin_ns: u64,
    audio_ts_ns: u64,
    drift_ns: i64,
}

impl ClockSync {
    pub fn new(samples_per_frame: usize, sample_rate: u32, channels: u16, output_delay_ns: u64) -> Self {
        Self {
            frame_duration_ns: frame_duration_ns(samples_per_frame, sample_rate, channels),
            output_delay_ns,
            capture_begin_ns: 0,
            audio_ts_ns: 0,
            drift_ns: 0,
        }
    }

    /// Mark when audio capture (re)started, in the shared monotonic domain.
    pub fn set_capture_begin(&mut self, ns: u64) {
        self.capture_begin_ns = ns;
    }

    pub fn capture_begin(&self) -> u64 {
        self.capture_begin_ns
    }

    /// Timestamp the frame that just completed.
    ///
    /// `block_ts_ns` is the block clock at the end of the frame and
    /// `video_reference_ns` the video start mark (0 when unknown). Returns
    /// the timestamp to publish, output delay included.
    pub fn stamp(&mut self, block_ts_ns: u64, video_reference_ns: u64) -> u64 {
        if self.audio_ts_ns == 0 {
            self.audio_ts_ns = if video_reference_ns > 0 && video_reference_ns < self.capture_begin_ns {
                self.capture_begin_ns - video_reference_ns
            } else {
                UNSYNCED_ANCHOR_NS
            };
        } else {
            self.audio_ts_ns += self.frame_duration_ns;
        }

        // Shift the block clock back to the start of the frame and into the
        // audio timeline before comparing.
        let normalized = block_ts_ns
            .saturating_sub(self.capture_begin_ns)
            .saturating_sub(self.frame_duration_ns);
        self.drift_ns = normalized as i64 - self.audio_ts_ns as i64;

        self.audio_ts_ns + self.output_delay_ns
    }

    /// Last emitted audio timestamp without the output delay (0 = unanchored).
    pub fn audio_timestamp(&self) -> u64 {
        self.audio_ts_ns
    }

    pub fn drift(&self) -> i64 {
        self.drift_ns
    }

    pub fn frame_duration(&self) -> u64 {
        self.frame_duration_ns
    }

    pub fn output_delay(&self) -> u64 {
        self.output_delay_ns
    }

    pub fn is_anchored(&self) -> bool {
        self.audio_ts_ns != 0
    }

    /// Forget the anchor, drift, delay and capture-begin mark.
    pub fn reset(&mut self) {
        self.output_delay_ns = 0;
        self.capture_begin_ns = 0;
        self.audio_ts_ns = 0;
        self.drift_ns = 0;
    }
}
