use serde::{Deserialize, Serialize};

/// Transport type for an audio device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioTransportType {
    BuiltIn,
    Usb,
    Bluetooth,
    Virtual,
    Unknown,
}

/// An audio input device available for capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSource {
    pub id: String,
    pub name: String,
    pub is_default: bool,
    pub transport_type: Option<AudioTransportType>,
    pub defaults: DeviceDefaults,
}

/// Native stream parameters reported by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDefaults {
    /// Default sample rate in Hz.
    pub sample_rate: u32,
    /// Maximum/default input channel count.
    pub channels: u16,
}

impl Default for DeviceDefaults {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
        }
    }
}

/// Stream format fixed by `configure` for the lifetime of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedFormat {
    pub sample_rate: u32,
    pub channels: u16,
    /// Encoder frame size per channel, as negotiated with the codec.
    pub frame_size: usize,
    /// Interleaved samples in one encoder frame (`frame_size * channels`).
    pub samples_per_frame: usize,
    pub bytes_per_sample: usize,
    /// Offset added to every published timestamp.
    pub output_delay_ns: u64,
}

impl ResolvedFormat {
    /// Bytes in one encoder frame.
    pub fn frame_bytes(&self) -> usize {
        self.samples_per_frame * self.bytes_per_sample
    }

    /// Duration covered by one encoder frame, in nanoseconds.
    pub fn frame_duration_ns(&self) -> u64 {
        frame_duration_ns(self.samples_per_frame, self.sample_rate, self.channels)
    }
}

/// `1e9 * samples_per_frame / (sample_rate * channels)` in integer nanoseconds.
pub fn frame_duration_ns(samples_per_frame: usize, sample_rate: u32, channels: u16) -> u64 {
    let per_second = sample_rate as u64 * channels as u64;
    if per_second == 0 {
        return 0;
    }
    (1_000_000_000u128 * samples_per_frame as u128 / per_second as u128) as u64
}

/// One encoder-sized frame of interleaved `f32` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    /// Presentation timestamp (ns, monotonic domain), output delay included.
    pub timestamp_ns: u64,
}

/// A frame converted to signed 16-bit PCM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pcm16Frame {
    pub samples: Vec<i16>,
    pub timestamp_ns: u64,
}

/// Counters for debugging capture sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CaptureSessionDiagnostics {
    pub callback_count: u64,
    pub samples_total: u64,
    pub silent_blocks: u64,
    pub skipped_blocks: u64,
    pub frames_published: u64,
    pub frames_dropped: u64,
    pub stream_errors: u64,
    /// Last measured drift between the normalized block clock and the
    /// emitted audio timestamp.
    pub last_drift_ns: i64,
    pub last_timestamp_ns: u64,
}
