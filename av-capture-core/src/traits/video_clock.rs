/// What the audio path needs to know about video capture.
///
/// Both readings must use the same `MonotonicClock` as the audio backend.
pub trait VideoClock: Send + Sync {
    /// Monotonic timestamp of the first captured video frame, 0 while unknown.
    fn reference_timestamp_ns(&self) -> u64;

    /// Whether video capture is still running. Audio capture completes as
    /// soon as this turns false.
    fn is_capturing(&self) -> bool;
}
