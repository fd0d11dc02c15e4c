use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Frames per encoder frame for the raw PCM path, which has no codec to
/// negotiate with (one MPEG audio frame).
pub const PCM_FRAME_SIZE: usize = 1152;

/// Video codecs below this rate report unreliable timing, so no lookahead
/// delay is applied.
const MIN_LOOKAHEAD_FPS: u32 = 5;

/// Audio codec selected for the recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    /// Raw PCM, muxed without an encoder.
    Pcm,
    Mp2,
    Mp3,
    Aac,
    Ac3,
    Vorbis,
}

impl AudioCodec {
    /// Whether the frame size is a fixed constant rather than negotiated
    /// with an opened encoder.
    pub fn has_fixed_frame_size(&self) -> bool {
        matches!(self, Self::Pcm)
    }
}

/// Video codec selected for the recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    Mjpeg,
    Yuyv,
    H264,
    Mpeg4,
    Vp8,
    Theora,
}

impl VideoCodec {
    /// Codecs whose encoder buffers frames ahead of output, delaying video
    /// by two frames relative to capture.
    pub fn needs_encoder_lookahead(&self) -> bool {
        matches!(self, Self::H264)
    }
}

/// Frame rate as a rational `num / den` frames per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Duration of one frame in nanoseconds, 0 for a degenerate rate.
    pub fn period_ns(&self) -> u64 {
        if self.num == 0 {
            return 0;
        }
        self.den as u64 * 1_000_000_000 / self.num as u64
    }

    /// Whether the rate is at least `fps` whole frames per second.
    pub fn at_least(&self, fps: u32) -> bool {
        self.den != 0 && self.num as u64 >= fps as u64 * self.den as u64
    }
}

/// Configuration for a capture session.
///
/// Everything left as `None` is resolved against the device defaults when
/// the session is configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfiguration {
    /// Input device identifier, or None for the backend default.
    pub device_id: Option<String>,

    /// Sample rate override in Hz (None = device default).
    pub sample_rate: Option<u32>,

    /// Channel count override (None = device default, capped to stereo).
    pub channels: Option<u16>,

    pub audio_codec: AudioCodec,

    pub video_codec: VideoCodec,

    /// Rate the video device captures at.
    pub video_frame_rate: FrameRate,

    /// Rate configured on the video encoder, when it differs from capture.
    pub encoder_frame_rate: Option<FrameRate>,

    /// Extra user-configured offset added to every audio timestamp (ns).
    pub user_delay_ns: u64,

    /// Video frames discarded at start while the camera settles.
    pub skip_frames: u32,

    /// Preferred hardware block size in frames (None = backend default).
    pub block_frames: Option<u32>,
}

impl CaptureConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(rate) = self.sample_rate {
            if !(8_000..=192_000).contains(&rate) {
                return Err(format!("unsupported sample rate: {}", rate));
            }
        }
        if let Some(channels) = self.channels {
            if !(1..=8).contains(&channels) {
                return Err(format!("unsupported channel count: {}", channels));
            }
        }
        if self.video_frame_rate.num == 0 || self.video_frame_rate.den == 0 {
            return Err("video frame rate must be positive".into());
        }
        if let Some(rate) = self.encoder_frame_rate {
            if rate.num == 0 || rate.den == 0 {
                return Err("encoder frame rate must be positive".into());
            }
        }
        if self.block_frames == Some(0) {
            return Err("block size must be positive".into());
        }
        Ok(())
    }

    /// Frame rate used for delay computation: the encoder's when set.
    pub fn effective_frame_rate(&self) -> FrameRate {
        self.encoder_frame_rate.unwrap_or(self.video_frame_rate)
    }

    /// Offset applied to every audio timestamp: two video frames of encoder
    /// lookahead for codecs that need it, plus the user delay.
    pub fn resolve_output_delay(&self) -> u64 {
        let rate = self.effective_frame_rate();
        let lookahead = if self.video_codec.needs_encoder_lookahead() && rate.at_least(MIN_LOOKAHEAD_FPS) {
            2 * rate.period_ns()
        } else {
            0
        };
        lookahead + self.user_delay_ns
    }

    pub fn from_json_str(json: &str) -> Result<Self, CaptureError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CaptureError::ConfigurationFailed(format!("failed to parse configuration: {}", e)))?;
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CaptureError> {
        let json = fs::read_to_string(path)
            .map_err(|e| CaptureError::ConfigurationFailed(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            device_id: None,
            sample_rate: None,
            channels: None,
            audio_codec: AudioCodec::Pcm,
            video_codec: VideoCodec::Mjpeg,
            video_frame_rate: FrameRate::new(30, 1),
            encoder_frame_rate: None,
            user_delay_ns: 0,
            skip_frames: 0,
            block_frames: None,
        }
    }
}
