use serde::{Deserialize, Serialize};

use super::action::SemanticAction;

/// Window and frame the most recently dispatched action ran in.
///
/// Recording always starts in window 0 at the top frame. Entering another
/// window resets the frame, since a freshly focused window starts at its
/// top-level document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub last_window: i64,
    pub last_frame: Option<String>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn needs_window_switch(&self, action: &SemanticAction) -> bool {
        action.window != self.last_window
    }

    pub fn needs_frame_switch(&self, action: &SemanticAction) -> bool {
        action.frame != self.last_frame
    }

    pub fn enter_window(&mut self, window: i64) {
        self.last_window = window;
        self.last_frame = None;
    }

    pub fn enter_frame(&mut self, frame: Option<String>) {
        self.last_frame = frame;
    }
}
