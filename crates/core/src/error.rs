use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid data for {cmd}: {reason}")]
    InvalidData { cmd: String, reason: String },

    #[error("Unknown faker placeholder: {0}")]
    UnknownPlaceholder(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl CoreError {
    pub fn invalid_data(cmd: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidData {
            cmd: cmd.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
