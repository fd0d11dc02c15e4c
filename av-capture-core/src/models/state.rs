use super::error::CaptureError;

/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle → configured → capturing → stopping → idle
///            ↓
///          failed ───────────────→ (stop) → idle
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureState {
    Idle,
    Configured,
    Capturing,
    Stopping,
    Failed(CaptureError),
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Capturing)
    }

    /// States from which `configure` may be called.
    pub fn can_configure(&self) -> bool {
        matches!(self, Self::Idle | Self::Configured | Self::Failed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Configured => "configured",
            Self::Capturing => "capturing",
            Self::Stopping => "stopping",
            Self::Failed(_) => "failed",
        }
    }
}
