use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::traits::video_clock::VideoClock;

/// Lock-free `VideoClock` the video capture path updates.
///
/// Share it as `Arc<VideoLink>`: the video thread writes, the audio
/// callback reads once per block.
#[derive(Debug, Default)]
pub struct VideoLink {
    reference_ns: AtomicU64,
    capturing: AtomicBool,
}

impl VideoLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the timestamp of the first video frame. Later calls are
    /// ignored until `reset`. Returns whether this call set it.
    pub fn mark_first_frame(&self, ts_ns: u64) -> bool {
        self.reference_ns
            .compare_exchange(0, ts_ns, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn set_capturing(&self, capturing: bool) {
        self.capturing.store(capturing, Ordering::Release);
    }

    pub fn reset(&self) {
        self.reference_ns.store(0, Ordering::Release);
        self.capturing.store(false, Ordering::Release);
    }
}

impl VideoClock for VideoLink {
    fn reference_timestamp_ns(&self) -> u64 {
        self.reference_ns.load(Ordering::Acquire)
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Acquire)
    }
}
