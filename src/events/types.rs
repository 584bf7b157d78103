/// Status events emitted by the realtime session and the dashboard
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Mode, Window};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub timestamp: DateTime<Utc>,
    pub session_id: Option<Uuid>,
    pub payload: StatusPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuspendReason {
    Drift,
    Pending,
}

impl SuspendReason {
    pub fn as_str(&self) -> &str {
        match self {
            SuspendReason::Drift => "DRIFT",
            SuspendReason::Pending => "PENDING",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StatusPayload {
    ModeSelected {
        mode: Mode,
    },
    BootstrapPending {
        window: Window,
    },
    SessionStarted {
        window: Window,
        samples: usize,
    },
    CycleApplied {
        window: Window,
        samples: usize,
    },
    Suspended {
        reason: SuspendReason,
        delay_ms: u64,
    },
    Resumed,
    CycleFailed {
        window: Option<Window>,
        code: String,
        message: String,
    },
    SessionStopped,
    Notice {
        message: String,
    },
}

impl StatusEvent {
    pub fn new(session_id: Option<Uuid>, payload: StatusPayload) -> Self {
        StatusEvent {
            timestamp: Utc::now(),
            session_id,
            payload,
        }
    }

    pub fn notice(message: impl Into<String>) -> Self {
        StatusEvent::new(None, StatusPayload::Notice { message: message.into() })
    }

    /// Error events are the ones the status line should highlight
    pub fn is_error(&self) -> bool {
        matches!(self.payload, StatusPayload::CycleFailed { .. })
    }

    /// One-line text for the user-facing status surface
    pub fn status_line(&self) -> String {
        match &self.payload {
            StatusPayload::ModeSelected { mode } => format!("Select {}", mode.as_str()),
            StatusPayload::BootstrapPending { .. } => "Waiting for data...".to_string(),
            StatusPayload::SessionStarted { window, samples } => format!(
                "Realtime started: {} samples over {}s",
                samples,
                window.len()
            ),
            StatusPayload::CycleApplied { samples, .. } => format!("Updated {} samples", samples),
            StatusPayload::Suspended { reason, delay_ms } => {
                format!("Update delayed {}ms ({})", delay_ms, reason.as_str())
            }
            StatusPayload::Resumed => "Realtime resumed".to_string(),
            StatusPayload::CycleFailed { message, .. } => message.clone(),
            StatusPayload::SessionStopped => "Realtime stopped".to_string(),
            StatusPayload::Notice { message } => message.clone(),
        }
    }
}
