use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::audio_models::{CaptureSessionDiagnostics, ResolvedFormat};

/// Summary of one capture session, produced when it is stopped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub backend: String,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub format: ResolvedFormat,
    pub diagnostics: CaptureSessionDiagnostics,
}

impl SessionReport {
    /// Wall-clock length of the session in seconds.
    pub fn duration_secs(&self) -> f64 {
        (self.stopped_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    /// Fraction of completed frames that were dropped because the ring was full.
    pub fn drop_ratio(&self) -> f64 {
        let total = self.diagnostics.frames_published + self.diagnostics.frames_dropped;
        if total == 0 {
            return 0.0;
        }
        self.diagnostics.frames_dropped as f64 / total as f64
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }
}
