use recorder_core::SessionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebDriverError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error object returned by the remote end.
    #[error("WebDriver error {status} ({error}): {message}")]
    Protocol {
        status: u16,
        error: String,
        message: String,
    },

    #[error("Session not created: {0}")]
    SessionNotCreated(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl WebDriverError {
    /// W3C error code, if the remote end reported one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Protocol { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_no_such_element(&self) -> bool {
        matches!(
            self.code(),
            Some("no such element") | Some("stale element reference")
        )
    }
}

pub type Result<T> = std::result::Result<T, WebDriverError>;

impl From<WebDriverError> for SessionError {
    fn from(err: WebDriverError) -> Self {
        match err {
            WebDriverError::Protocol {
                status,
                error,
                message,
            } => match error.as_str() {
                "no such element" | "stale element reference" => SessionError::NotFound(message),
                "no such window" | "no such frame" => SessionError::NoSuchWindow(message),
                "no such alert" => SessionError::NoSuchAlert,
                "timeout" | "script timeout" => SessionError::Timeout {
                    what: message,
                    timeout_ms: 0,
                },
                _ => SessionError::Protocol {
                    status,
                    error,
                    message,
                },
            },
            WebDriverError::Request(e) => SessionError::Transport(e.to_string()),
            WebDriverError::SessionNotCreated(msg) => SessionError::Transport(msg),
            WebDriverError::Serialization(e) => SessionError::InvalidResponse(e.to_string()),
            WebDriverError::InvalidResponse(msg) => SessionError::InvalidResponse(msg),
        }
    }
}
