/// Full-scale magnitude used when scaling normalized floats to 16 bits.
pub const INT16_SCALE: f32 = 32767.0;

/// Saturate an already-scaled sample to the `i16` range.
///
/// Values inside the range are truncated toward zero; values beyond it
/// stick to the boundary instead of wrapping. NaN maps to 0.
#[inline]
pub fn clip_int16(sample: f32) -> i16 {
    sample.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Converts normalized `f32` frames to signed 16-bit PCM.
///
/// The output buffer is allocated on first use, sized to the frame, and
/// reused by every later call.
#[derive(Debug, Default, Clone)]
pub struct SampleFormatConverter {
    buffer: Vec<i16>,
}

impl SampleFormatConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scale each sample by 32767 and clip. The returned slice borrows the
    /// internal buffer and is valid until the next call.
    pub fn float_to_int16(&mut self, frame: &[f32]) -> &[i16] {
        if self.buffer.len() != frame.len() {
            self.buffer.resize(frame.len(), 0);
        }
        for (out, &sample) in self.buffer.iter_mut().zip(frame) {
            *out = clip_int16(sample * INT16_SCALE);
        }
        &self.buffer
    }

    /// Size of the reusable output buffer (0 before the first conversion).
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}

/// Little-endian byte view of 16-bit samples, as muxers expect raw PCM.
pub fn to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        data.extend_from_slice(&sample.to_le_bytes());
    }
    data
}
