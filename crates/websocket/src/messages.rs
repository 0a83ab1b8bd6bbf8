use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use events::Event;
use recorder_core::RawEvent;

/// Settings pushed to the capture front-end as soon as it connects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Comma-separated attribute names used to build element locators.
    pub path_attrs: String,
    pub test_vars: Map<String, Value>,
    /// Module scripts the operator may insert.
    pub spec_lists: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    SaveCmd(RawEvent),
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    Config(ClientConfig),
    CheckResult { title: String, success: bool },
    ModuleStart { file: String },
    ModuleEnd { file: String, success: bool },
    Error { message: String },
}

impl ServerMessage {
    /// Front-end form of a bus event; internal events have none.
    pub fn from_event(event: &Event) -> Option<Self> {
        match event {
            Event::CheckResult { title, success } => Some(Self::CheckResult {
                title: title.clone(),
                success: *success,
            }),
            Event::ModuleStarted { file } => Some(Self::ModuleStart { file: file.clone() }),
            Event::ModuleEnded { file, success } => Some(Self::ModuleEnd {
                file: file.clone(),
                success: *success,
            }),
            _ => None,
        }
    }
}
