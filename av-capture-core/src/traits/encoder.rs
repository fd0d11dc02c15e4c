/// Frame requirements of an opened audio encoder.
///
/// Only meaningful once the codec is open: the frame size is negotiated by
/// the codec, so sessions must be configured after the encoder is opened.
pub trait EncoderFrameInfo {
    /// Samples per channel the encoder consumes per frame.
    fn frame_size(&self) -> usize;

    /// Width in bytes of one input sample.
    fn bytes_per_sample(&self) -> usize;
}

/// Plain-data encoder requirements, for encoders that report them up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedEncoderInfo {
    pub frame_size: usize,
    pub bytes_per_sample: usize,
}

impl EncoderFrameInfo for FixedEncoderInfo {
    fn frame_size(&self) -> usize {
        self.frame_size
    }

    fn bytes_per_sample(&self) -> usize {
        self.bytes_per_sample
    }
}
