//! Event types for the recorder event system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An [`Event`] stamped for delivery to listeners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: Event,
}

impl EventEnvelope {
    pub fn new(event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Which automation session an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRole {
    /// Browser the operator records in
    Recorder,
    /// Browser that replays and checks every action
    Checker,
}

impl SessionRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recorder => "recorder",
            Self::Checker => "checker",
        }
    }
}

/// Progress of a recording, as pushed to the capture front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A generated step was verified against the checker session
    #[serde(rename = "check.result")]
    CheckResult { title: String, success: bool },

    /// A module script started loading
    #[serde(rename = "module.started")]
    ModuleStarted { file: String },

    /// A module script finished
    #[serde(rename = "module.ended")]
    ModuleEnded { file: String, success: bool },

    /// An automation session became available
    #[serde(rename = "session.opened")]
    SessionOpened { role: SessionRole },

    /// An automation session was closed
    #[serde(rename = "session.closed")]
    SessionClosed { role: SessionRole },

    /// Something went wrong outside of a single step
    #[serde(rename = "error")]
    Error {
        message: String,
        context: Option<String>,
    },
}

impl Event {
    /// Get the module file associated with this event, if any
    pub fn module_file(&self) -> Option<&str> {
        match self {
            Event::ModuleStarted { file } | Event::ModuleEnded { file, .. } => Some(file),
            _ => None,
        }
    }

    /// Whether the capture front-end consumes this event
    pub fn is_client_visible(&self) -> bool {
        matches!(
            self,
            Event::CheckResult { .. } | Event::ModuleStarted { .. } | Event::ModuleEnded { .. }
        )
    }
}
