use crate::models::error::CaptureError;
use crate::models::session_report::SessionReport;
use crate::models::state::CaptureState;

/// Event delegate for capture session notifications.
///
/// Called from the thread driving the session lifecycle, or from the
/// backend's error path. Never from the real-time block callback.
pub trait CaptureDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: &CaptureState);

    /// Called when an error occurs during capture.
    fn on_error(&self, error: &CaptureError);

    /// Called when a running session has been torn down.
    fn on_capture_finished(&self, report: &SessionReport);
}
