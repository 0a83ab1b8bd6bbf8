use recorder_core::{CoreError, SessionError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("{0}")]
    Session(#[from] SessionError),

    #[error("Expected {expected} but got {actual}")]
    Assertion { expected: String, actual: String },

    #[error("Test variable not defined: {0}")]
    MissingVariable(String),

    #[error("Invalid regular expression {pattern}: {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("Failed to load module {name}: {reason}")]
    ModuleLoad { name: String, reason: String },

    #[error("Module nesting deeper than {0} levels")]
    ModuleDepth(usize),

    #[error("Module {name}: {failed} of {total} steps failed")]
    ModuleSteps {
        name: String,
        failed: usize,
        total: usize,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Queue worker stopped: {0}")]
    Worker(String),
}

impl OrchestratorError {
    pub fn assertion(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::Assertion {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn module_load(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::ModuleLoad {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
