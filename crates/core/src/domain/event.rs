use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;

use super::action::SemanticAction;
use crate::error::Result;

/// One interaction observed by the capture front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub window: i64,
    #[serde(default)]
    pub frame: Option<String>,
    pub cmd: String,
    #[serde(default)]
    pub data: Value,
}

impl RawEvent {
    pub fn new(window: i64, frame: Option<String>, cmd: impl Into<String>, data: Value) -> Self {
        Self {
            window,
            frame,
            cmd: cmd.into(),
            data,
        }
    }
}

/// What the capture front-end can send into the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Ingress {
    Event(RawEvent),
    /// The operator finished recording.
    End,
}

/// A decoded event travelling through the merge filters.
///
/// `received_at` is the arrival instant of the event that produced the
/// command; the double-click window is measured against it.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedCommand {
    pub action: SemanticAction,
    pub received_at: Instant,
}

impl StagedCommand {
    pub fn new(action: SemanticAction, received_at: Instant) -> Self {
        Self {
            action,
            received_at,
        }
    }

    pub fn decode(raw: RawEvent, received_at: Instant) -> Result<Self> {
        Ok(Self::new(SemanticAction::try_from(raw)?, received_at))
    }

    pub fn into_action(self) -> SemanticAction {
        self.action
    }
}
