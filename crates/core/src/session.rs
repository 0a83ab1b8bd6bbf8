//! Capability surface of a live automation session.
//!
//! The pipeline drives two independent sessions through this trait: the
//! recorder mirror (where the operator works) and the optional verification
//! session that replays every action. Every call may fail; callers classify
//! failures per sub-task instead of aborting.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::SelectOption;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Element not found: {0}")]
    NotFound(String),

    #[error("Timed out after {timeout_ms}ms waiting for {what}")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("No such window: {0}")]
    NoSuchWindow(String),

    #[error("No alert open")]
    NoSuchAlert,

    #[error("WebDriver error {status} ({error}): {message}")]
    Protocol {
        status: u16,
        error: String,
        message: String,
    },

    #[error("Transport failed: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl SessionError {
    pub fn timeout(what: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Opaque reference to an element located in a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// How long to poll for an element and whether it must be visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub displayed: bool,
}

impl WaitOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            displayed: true,
        }
    }

    pub fn hidden_ok(mut self) -> Self {
        self.displayed = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    Down,
    Up,
}

#[async_trait]
pub trait AutomationSession: Send + Sync {
    async fn navigate(&self, url: &str) -> SessionResult<()>;

    async fn close_window(&self) -> SessionResult<()>;

    async fn pause(&self, duration: Duration) -> SessionResult<()> {
        tokio::time::sleep(duration).await;
        Ok(())
    }

    /// Poll until `locator` resolves, honoring `options.displayed`.
    async fn wait_for(&self, locator: &str, options: WaitOptions) -> SessionResult<ElementHandle>;

    /// Move the pointer to the element, optionally offset from its top-left corner.
    async fn move_to(
        &self,
        element: &ElementHandle,
        offset: Option<(f64, f64)>,
    ) -> SessionResult<()>;

    async fn pointer_down(&self, button: u8) -> SessionResult<()>;

    async fn pointer_up(&self, button: u8) -> SessionResult<()>;

    async fn click(&self, button: u8) -> SessionResult<()>;

    async fn double_click(&self) -> SessionResult<()>;

    async fn touch_tap(&self, element: &ElementHandle) -> SessionResult<()>;

    /// Type into the currently focused element.
    async fn send_keys(&self, text: &str) -> SessionResult<()>;

    async fn send_keys_to(&self, element: &ElementHandle, text: &str) -> SessionResult<()>;

    async fn key_event(&self, key: &str, direction: KeyDirection) -> SessionResult<()>;

    async fn scroll_to(&self, x: f64, y: f64) -> SessionResult<()>;

    async fn select(&self, element: &ElementHandle, option: &SelectOption) -> SessionResult<()>;

    async fn accept_alert(&self) -> SessionResult<()>;

    async fn dismiss_alert(&self) -> SessionResult<()>;

    async fn set_alert_text(&self, text: &str) -> SessionResult<()>;

    async fn element_value(&self, element: &ElementHandle) -> SessionResult<String>;

    async fn set_element_value(&self, element: &ElementHandle, value: &str) -> SessionResult<()>;

    async fn element_text(&self, element: &ElementHandle) -> SessionResult<String>;

    async fn element_displayed(&self, element: &ElementHandle) -> SessionResult<bool>;

    async fn element_enabled(&self, element: &ElementHandle) -> SessionResult<bool>;

    async fn element_selected(&self, element: &ElementHandle) -> SessionResult<bool>;

    async fn element_attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> SessionResult<Option<String>>;

    async fn element_css(&self, element: &ElementHandle, property: &str) -> SessionResult<String>;

    async fn current_url(&self) -> SessionResult<String>;

    async fn title(&self) -> SessionResult<String>;

    async fn cookie(&self, name: &str) -> SessionResult<Option<String>>;

    async fn local_storage(&self, key: &str) -> SessionResult<Option<String>>;

    async fn session_storage(&self, key: &str) -> SessionResult<Option<String>>;

    /// Switch to the window at `index` in handle order.
    async fn switch_window(&self, index: i64) -> SessionResult<()>;

    /// `None` returns to the top-level document.
    async fn switch_frame(&self, element: Option<&ElementHandle>) -> SessionResult<()>;

    /// Cheap round-trip used to keep the session from idling out.
    async fn probe(&self) -> SessionResult<()>;

    /// Resolves once the current document finished loading.
    async fn wait_ready(&self, timeout: Duration) -> SessionResult<()>;

    /// End the session and release the browser.
    async fn close(&self) -> SessionResult<()>;
}
