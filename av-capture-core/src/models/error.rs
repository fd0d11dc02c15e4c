use thiserror::Error;

/// Errors that can occur during audio capture operations.
///
/// Configuration failures are reported before anything is allocated.
/// Stream failures during `start` are reported after every partially
/// acquired resource has been released.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("device not available: {0}")]
    DeviceNotAvailable(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("failed to open audio stream: {0}")]
    StreamOpenFailed(String),

    #[error("failed to start audio stream: {0}")]
    StreamStartFailed(String),

    #[error("failed to stop audio stream: {0}")]
    StreamStopFailed(String),

    #[error("audio stream error: {0}")]
    StreamError(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Short, stable category code for log lines.
    pub fn category(&self) -> &'static str {
        match self {
            Self::DeviceNotAvailable(_) => "device",
            Self::UnsupportedFormat(_) | Self::ConfigurationFailed(_) => "config",
            Self::StreamOpenFailed(_) => "open",
            Self::StreamStartFailed(_) => "start",
            Self::StreamStopFailed(_) => "stop",
            Self::StreamError(_) => "stream",
            Self::InvalidState(_) => "state",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Whether the error was raised while configuring, before allocation.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotAvailable(_) | Self::UnsupportedFormat(_) | Self::ConfigurationFailed(_)
        )
    }
}
