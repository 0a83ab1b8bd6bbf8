use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Key under which W3C remote ends serialize element references.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52f-4a5dbf59bb65";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Parameters for a new browser session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub browser_name: String,
    pub args: Vec<String>,
    /// Host overrides handed to the browser as `host ip` lines.
    pub hosts: Option<String>,
    pub poll_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            browser_name: "chrome".to_string(),
            args: Vec::new(),
            hosts: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl SessionOptions {
    pub fn new(browser_name: impl Into<String>) -> Self {
        Self {
            browser_name: browser_name.into(),
            ..Default::default()
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_hosts(mut self, hosts: impl Into<String>) -> Self {
        self.hosts = Some(hosts.into());
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Body of the `POST /session` request.
    pub fn capabilities(&self) -> Value {
        let mut always_match = Map::new();
        always_match.insert("browserName".to_string(), json!(self.browser_name));
        if !self.args.is_empty() {
            always_match.insert("goog:chromeOptions".to_string(), json!({ "args": self.args }));
        }
        if let Some(hosts) = &self.hosts {
            always_match.insert("uirecorder:hosts".to_string(), json!(hosts));
        }
        json!({ "capabilities": { "alwaysMatch": always_match } })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewSession {
    pub session_id: String,
    #[serde(default)]
    pub capabilities: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorValue {
    pub error: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct Rect {
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

/// Locator strategy for a front-end element path.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Locator<'a> {
    using: &'static str,
    value: &'a str,
}

impl<'a> Locator<'a> {
    pub fn parse(path: &'a str) -> Self {
        let using = if path.starts_with('/') || path.starts_with("(/") {
            "xpath"
        } else {
            "css selector"
        };
        Self { using, value: path }
    }
}

pub(crate) fn element_ref(id: &str) -> Value {
    let mut reference = Map::new();
    reference.insert(ELEMENT_KEY.to_string(), Value::String(id.to_string()));
    Value::Object(reference)
}
