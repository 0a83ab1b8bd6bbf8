#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use orchestrator::error::{OrchestratorError, Result};
use orchestrator::{ModuleSource, Reporter, Summary, Verdict};
use recorder_core::{
    AutomationSession, ElementHandle, KeyDirection, RawEvent, SelectOption, SemanticAction,
    SessionError, SessionResult, WaitOptions,
};

/// In-memory session that records every call and fails on request.
#[derive(Default)]
pub struct MockSession {
    calls: Mutex<Vec<String>>,
    missing: HashSet<String>,
    values: HashMap<String, String>,
    title: String,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_missing(mut self, locator: &str) -> Self {
        self.missing.insert(locator.to_string());
        self
    }

    pub fn with_value(mut self, locator: &str, value: &str) -> Self {
        self.values.insert(locator.to_string(), value.to_string());
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl AutomationSession for MockSession {
    async fn navigate(&self, url: &str) -> SessionResult<()> {
        self.record(format!("navigate {url}"));
        Ok(())
    }

    async fn close_window(&self) -> SessionResult<()> {
        self.record("close_window");
        Ok(())
    }

    async fn pause(&self, _duration: Duration) -> SessionResult<()> {
        Ok(())
    }

    async fn wait_for(&self, locator: &str, _options: WaitOptions) -> SessionResult<ElementHandle> {
        if self.missing.contains(locator) {
            return Err(SessionError::NotFound(locator.to_string()));
        }
        self.record(format!("wait_for {locator}"));
        Ok(ElementHandle::new(locator))
    }

    async fn move_to(&self, element: &ElementHandle, offset: Option<(f64, f64)>) -> SessionResult<()> {
        match offset {
            Some((x, y)) => self.record(format!("move_to {} {x} {y}", element.id())),
            None => self.record(format!("move_to {}", element.id())),
        }
        Ok(())
    }

    async fn pointer_down(&self, button: u8) -> SessionResult<()> {
        self.record(format!("pointer_down {button}"));
        Ok(())
    }

    async fn pointer_up(&self, button: u8) -> SessionResult<()> {
        self.record(format!("pointer_up {button}"));
        Ok(())
    }

    async fn click(&self, button: u8) -> SessionResult<()> {
        self.record(format!("click {button}"));
        Ok(())
    }

    async fn double_click(&self) -> SessionResult<()> {
        self.record("double_click");
        Ok(())
    }

    async fn touch_tap(&self, element: &ElementHandle) -> SessionResult<()> {
        self.record(format!("touch_tap {}", element.id()));
        Ok(())
    }

    async fn send_keys(&self, text: &str) -> SessionResult<()> {
        self.record(format!("send_keys {text}"));
        Ok(())
    }

    async fn send_keys_to(&self, element: &ElementHandle, text: &str) -> SessionResult<()> {
        self.record(format!("send_keys_to {} {text}", element.id()));
        Ok(())
    }

    async fn key_event(&self, key: &str, direction: KeyDirection) -> SessionResult<()> {
        self.record(format!("key_event {key} {direction:?}"));
        Ok(())
    }

    async fn scroll_to(&self, x: f64, y: f64) -> SessionResult<()> {
        self.record(format!("scroll_to {x} {y}"));
        Ok(())
    }

    async fn select(&self, element: &ElementHandle, option: &SelectOption) -> SessionResult<()> {
        self.record(format!("select {} {}", element.id(), option.value));
        Ok(())
    }

    async fn accept_alert(&self) -> SessionResult<()> {
        self.record("accept_alert");
        Ok(())
    }

    async fn dismiss_alert(&self) -> SessionResult<()> {
        self.record("dismiss_alert");
        Ok(())
    }

    async fn set_alert_text(&self, text: &str) -> SessionResult<()> {
        self.record(format!("set_alert_text {text}"));
        Ok(())
    }

    async fn element_value(&self, element: &ElementHandle) -> SessionResult<String> {
        Ok(self.values.get(element.id()).cloned().unwrap_or_default())
    }

    async fn set_element_value(&self, element: &ElementHandle, value: &str) -> SessionResult<()> {
        self.record(format!("set_value {} {value}", element.id()));
        Ok(())
    }

    async fn element_text(&self, element: &ElementHandle) -> SessionResult<String> {
        Ok(self.values.get(element.id()).cloned().unwrap_or_default())
    }

    async fn element_displayed(&self, _element: &ElementHandle) -> SessionResult<bool> {
        Ok(true)
    }

    async fn element_enabled(&self, _element: &ElementHandle) -> SessionResult<bool> {
        Ok(true)
    }

    async fn element_selected(&self, _element: &ElementHandle) -> SessionResult<bool> {
        Ok(false)
    }

    async fn element_attribute(
        &self,
        _element: &ElementHandle,
        _name: &str,
    ) -> SessionResult<Option<String>> {
        Ok(None)
    }

    async fn element_css(&self, _element: &ElementHandle, _property: &str) -> SessionResult<String> {
        Ok(String::new())
    }

    async fn current_url(&self) -> SessionResult<String> {
        Ok("http://example.test/".to_string())
    }

    async fn title(&self) -> SessionResult<String> {
        Ok(self.title.clone())
    }

    async fn cookie(&self, _name: &str) -> SessionResult<Option<String>> {
        Ok(None)
    }

    async fn local_storage(&self, _key: &str) -> SessionResult<Option<String>> {
        Ok(None)
    }

    async fn session_storage(&self, _key: &str) -> SessionResult<Option<String>> {
        Ok(None)
    }

    async fn switch_window(&self, index: i64) -> SessionResult<()> {
        self.record(format!("switch_window {index}"));
        Ok(())
    }

    async fn switch_frame(&self, element: Option<&ElementHandle>) -> SessionResult<()> {
        match element {
            Some(element) => self.record(format!("switch_frame {}", element.id())),
            None => self.record("switch_frame null"),
        }
        Ok(())
    }

    async fn probe(&self) -> SessionResult<()> {
        Ok(())
    }

    async fn wait_ready(&self, _timeout: Duration) -> SessionResult<()> {
        self.record("wait_ready");
        Ok(())
    }

    async fn close(&self) -> SessionResult<()> {
        self.record("close");
        Ok(())
    }
}

/// Modules held in memory by name.
#[derive(Default)]
pub struct MemoryModules {
    modules: BTreeMap<String, Vec<SemanticAction>>,
}

impl MemoryModules {
    pub fn with(mut self, name: &str, actions: Vec<SemanticAction>) -> Self {
        self.modules.insert(name.to_string(), actions);
        self
    }
}

#[async_trait]
impl ModuleSource for MemoryModules {
    async fn load(&self, name: &str) -> Result<Vec<SemanticAction>> {
        self.modules
            .get(name)
            .cloned()
            .ok_or_else(|| OrchestratorError::module_load(name, "not found"))
    }
}

/// Reporter that keeps every line it was given.
#[derive(Default)]
pub struct RecordingReporter {
    lines: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    fn push(&self, line: String) {
        self.lines.lock().unwrap().push(line);
    }
}

fn mark(verdict: &Verdict) -> &'static str {
    match verdict {
        Verdict::Passed => "pass",
        Verdict::Failed(_) => "fail",
        Verdict::Unchecked => "unchecked",
    }
}

impl Reporter for RecordingReporter {
    fn step_finished(&self, title: &str, verdict: &Verdict) {
        self.push(format!("{} {title}", mark(verdict)));
    }

    fn module_step(&self, name: &str, title: &str, verdict: &Verdict) {
        self.push(format!("{name} > {} {title}", mark(verdict)));
    }

    fn summary(&self, summary: &Summary) {
        self.push(format!("summary {}/{}", summary.failed, summary.total));
    }
}

pub fn raw(window: i64, frame: Option<&str>, cmd: &str, data: Value) -> RawEvent {
    RawEvent::new(window, frame.map(String::from), cmd, data)
}

pub fn semantic(window: i64, frame: Option<&str>, cmd: &str, data: Value) -> SemanticAction {
    SemanticAction::try_from(raw(window, frame, cmd, data)).unwrap()
}

pub fn mouse(cmd: &str, path: &str, x: f64, y: f64) -> RawEvent {
    raw(0, None, cmd, json!({ "path": path, "x": x, "y": y, "button": 0 }))
}

pub fn shared(session: MockSession) -> (Arc<MockSession>, Arc<dyn AutomationSession>) {
    let session = Arc::new(session);
    let dynamic: Arc<dyn AutomationSession> = session.clone();
    (session, dynamic)
}
