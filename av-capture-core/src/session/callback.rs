//! Real-time producer.
//!
//! Runs on the backend's audio thread once per hardware block. Everything
//! here is O(block) under the session lock: no allocation, no blocking
//! calls, and drop logging is rate-limited.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::CaptureError;
use crate::processing::ring_buffer::RingError;
use crate::session::state::SessionState;
use crate::traits::capture_backend::{BlockSink, StreamControl};
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::video_clock::VideoClock;

const NSEC_PER_SEC: u64 = 1_000_000_000;

/// Log the first dropped frame and then every this many.
const DROP_LOG_INTERVAL: u64 = 100;

/// Accumulates hardware blocks into encoder frames, stamps them and
/// publishes them into the session ring.
pub struct CaptureCallback {
    state: Arc<Mutex<SessionState>>,
    video: Arc<dyn VideoClock>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
}

impl CaptureCallback {
    pub(crate) fn new(
        state: Arc<Mutex<SessionState>>,
        video: Arc<dyn VideoClock>,
        delegate: Option<Arc<dyn CaptureDelegate>>,
    ) -> Self {
        Self { state, video, delegate }
    }
}

impl BlockSink for CaptureCallback {
    fn on_block(&self, samples: Option<&[f32]>, frames: usize, now_ns: u64) -> StreamControl {
        let mut state = self.state.lock();
        process_block(&mut state, self.video.as_ref(), samples, frames, now_ns)
    }

    fn on_stream_error(&self, error: &CaptureError) {
        {
            let mut state = self.state.lock();
            state.stream_failed = true;
            state.streaming = false;
            state.diagnostics.stream_errors += 1;
        }
        log::error!("Audio stream error [{}]: {}", error.category(), error);
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(error);
        }
    }
}

/// Producer step for one block. The caller holds the session lock.
fn process_block(
    state: &mut SessionState,
    video: &dyn VideoClock,
    samples: Option<&[f32]>,
    frames: usize,
    now_ns: u64,
) -> StreamControl {
    state.diagnostics.callback_count += 1;

    let format = match state.format {
        Some(format) if !state.stream_failed && state.has_buffers() => format,
        _ => {
            state.streaming = false;
            return StreamControl::Complete;
        }
    };

    let video_capturing = state.capture_active && video.is_capturing();
    let sample_rate = format.sample_rate as u64;

    // The block ends at `now`; work back to when its first frame was captured.
    let block_start = now_ns.saturating_sub(frames as u64 * NSEC_PER_SEC / sample_rate);

    if state.skip_frames > 0 {
        state.diagnostics.skipped_blocks += 1;
        if video_capturing {
            state.clock.set_capture_begin(now_ns);
            return StreamControl::Continue;
        }
        state.streaming = false;
        return StreamControl::Complete;
    }

    state.streaming = true;
    if samples.is_none() {
        state.diagnostics.silent_blocks += 1;
    }

    let channels = format.channels as usize;
    let frame_len = format.samples_per_frame;
    let total = frames * channels;
    state.diagnostics.samples_total += total as u64;

    let SessionState {
        sample_index,
        streaming,
        clock,
        accumulation,
        ring,
        diagnostics,
        stream_failed,
        ..
    } = state;
    let (Some(accumulation), Some(ring)) = (accumulation.as_mut(), ring.as_mut()) else {
        *streaming = false;
        return StreamControl::Complete;
    };

    let mut copied = 0;
    while copied < total {
        let take = (frame_len - *sample_index).min(total - copied);
        let dst = &mut accumulation[*sample_index..*sample_index + take];

        match samples {
            Some(src) => {
                // Short hardware buffers are padded with silence.
                let available = src.len().saturating_sub(copied).min(take);
                dst[..available].copy_from_slice(&src[copied..copied + available]);
                dst[available..].fill(0.0);
            }
            None => dst.fill(0.0),
        }

        copied += take;
        *sample_index += take;

        if *sample_index < frame_len {
            continue;
        }
        *sample_index = 0;

        // Block clock advanced by every whole frame copied so far.
        let frame_end_ns = block_start + (copied / channels) as u64 * NSEC_PER_SEC / sample_rate;
        let video_reference = if clock.is_anchored() {
            0
        } else {
            video.reference_timestamp_ns()
        };
        let timestamp = clock.stamp(frame_end_ns, video_reference);
        diagnostics.last_drift_ns = clock.drift();
        diagnostics.last_timestamp_ns = timestamp;

        match ring.try_publish(accumulation, timestamp) {
            Ok(()) => diagnostics.frames_published += 1,
            Err(RingError::Full) => {
                diagnostics.frames_dropped += 1;
                if diagnostics.frames_dropped % DROP_LOG_INTERVAL == 1 {
                    log::warn!(
                        "Audio ring full, dropping frame at {} ns ({} dropped so far)",
                        timestamp,
                        diagnostics.frames_dropped
                    );
                }
            }
            Err(err @ RingError::FrameSizeMismatch { .. }) => {
                log::error!("Audio frame rejected: {}", err);
                *stream_failed = true;
                *streaming = false;
                return StreamControl::Complete;
            }
        }
    }

    if video_capturing {
        StreamControl::Continue
    } else {
        *streaming = false;
        StreamControl::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audio_models::ResolvedFormat;
    use crate::session::video_link::VideoLink;

    const MS: u64 = 1_000_000;

    fn format(frame_size: usize, channels: u16) -> ResolvedFormat {
        ResolvedFormat {
            sample_rate: 48_000,
            channels,
            frame_size,
            samples_per_frame: frame_size * channels as usize,
            bytes_per_sample: 4,
            output_delay_ns: 0,
        }
    }

    fn armed_state(format: ResolvedFormat, slots: usize) -> SessionState {
        let mut state = SessionState::new();
        state.format = Some(format);
        state.allocate(&format, slots).unwrap();
        state
    }

    fn live_video() -> VideoLink {
        let video = VideoLink::new();
        video.set_capturing(true);
        video
    }

    #[test]
    fn accumulates_across_blocks() {
        let mut state = armed_state(format(4, 2), 4);
        let video = live_video();

        // 3 frames per block, 4 frames per encoder frame.
        let block = [0.25f32; 6];
        assert_eq!(process_block(&mut state, &video, Some(&block), 3, 100 * MS), StreamControl::Continue);
        assert_eq!(state.diagnostics.frames_published, 0);
        assert_eq!(state.sample_index, 6);

        process_block(&mut state, &video, Some(&block), 3, 200 * MS);
        assert_eq!(state.diagnostics.frames_published, 1);
        assert_eq!(state.sample_index, 4);
        assert!(state.streaming);
    }

    #[test]
    fn missing_samples_are_silence() {
        let mut state = armed_state(format(2, 1), 2);
        let video = live_video();

        process_block(&mut state, &video, None, 2, 10 * MS);
        let frame = state.ring.as_mut().unwrap().try_consume().unwrap();
        assert_eq!(frame.samples, vec![0.0, 0.0]);
        assert_eq!(state.diagnostics.silent_blocks, 1);
    }

    #[test]
    fn short_buffer_is_zero_padded() {
        let mut state = armed_state(format(2, 2), 2);
        let video = live_video();

        process_block(&mut state, &video, Some(&[0.5, 0.5, 0.5]), 2, 10 * MS);
        let frame = state.ring.as_mut().unwrap().try_consume().unwrap();
        assert_eq!(frame.samples, vec![0.5, 0.5, 0.5, 0.0]);
    }

    #[test]
    fn skip_refreshes_capture_begin() {
        let mut state = armed_state(format(2, 1), 2);
        state.skip_frames = 2;
        let video = live_video();

        assert_eq!(process_block(&mut state, &video, Some(&[0.1, 0.1]), 2, 40 * MS), StreamControl::Continue);
        assert_eq!(state.clock.capture_begin(), 40 * MS);
        assert_eq!(process_block(&mut state, &video, Some(&[0.1, 0.1]), 2, 80 * MS), StreamControl::Continue);
        assert_eq!(state.clock.capture_begin(), 80 * MS);

        assert_eq!(state.diagnostics.frames_published, 0);
        assert_eq!(state.sample_index, 0);
        assert!(!state.streaming);
    }

    #[test]
    fn skip_after_video_stopped_completes() {
        let mut state = armed_state(format(2, 1), 2);
        state.skip_frames = 1;
        let video = VideoLink::new();

        assert_eq!(process_block(&mut state, &video, Some(&[0.1, 0.1]), 2, 40 * MS), StreamControl::Complete);
        assert!(!state.streaming);
    }

    #[test]
    fn completes_when_video_stops_but_keeps_last_block() {
        let mut state = armed_state(format(2, 1), 2);
        let video = VideoLink::new();

        assert_eq!(process_block(&mut state, &video, Some(&[0.1, 0.2]), 2, 40 * MS), StreamControl::Complete);
        assert_eq!(state.diagnostics.frames_published, 1);
        assert!(!state.streaming);
    }

    #[test]
    fn full_ring_drops_and_counts() {
        let mut state = armed_state(format(1, 1), 2);
        let video = live_video();

        process_block(&mut state, &video, Some(&[0.1, 0.2, 0.3]), 3, 40 * MS);
        assert_eq!(state.diagnostics.frames_published, 2);
        assert_eq!(state.diagnostics.frames_dropped, 1);

        let ring = state.ring.as_mut().unwrap();
        assert_eq!(ring.try_consume().unwrap().samples, vec![0.1]);
        assert_eq!(ring.try_consume().unwrap().samples, vec![0.2]);
        assert!(ring.try_consume().is_none());
    }

    #[test]
    fn released_state_completes() {
        let mut state = armed_state(format(2, 1), 2);
        state.release();
        let video = live_video();

        assert_eq!(process_block(&mut state, &video, Some(&[0.1, 0.1]), 2, 40 * MS), StreamControl::Complete);
    }

    #[test]
    fn stream_error_stops_further_blocks() {
        let format = format(2, 1);
        let state = Arc::new(Mutex::new(armed_state(format, 2)));
        let video = Arc::new(live_video());
        let callback = CaptureCallback::new(Arc::clone(&state), video, None);

        callback.on_stream_error(&CaptureError::StreamError("device unplugged".into()));
        assert_eq!(callback.on_block(Some(&[0.1, 0.1]), 2, 40 * MS), StreamControl::Complete);

        let state = state.lock();
        assert_eq!(state.diagnostics.stream_errors, 1);
        assert_eq!(state.diagnostics.frames_published, 0);
        assert!(!state.streaming);
    }

    #[test]
    fn frame_timestamps_use_block_end_for_drift() {
        let mut state = armed_state(format(480, 1), 4);
        state.clock.set_capture_begin(1_000 * MS);
        let video = live_video();

        // 480 frames at 48 kHz = 10 ms; the block ended at 1010 ms, so the
        // frame started exactly at capture begin and drift is -anchor.
        let block = vec![0.0f32; 480];
        process_block(&mut state, &video, Some(&block), 480, 1_010 * MS);
        assert_eq!(state.diagnostics.last_timestamp_ns, 1);
        assert_eq!(state.diagnostics.last_drift_ns, -1);
    }
}
