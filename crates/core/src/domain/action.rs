//! Canonical action vocabulary.
//!
//! Raw front-end events carry a free-form `cmd` string and a JSON `data`
//! object. Everything past the ingress boundary works on the closed
//! [`Action`] enum instead, so the queue, executor and code generator are
//! exhaustive over the vocabulary.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::event::RawEvent;
use crate::error::{CoreError, Result};

/// Pixel tolerance (exclusive) for merging two pointer events on the same element.
pub const MERGE_TOLERANCE_PX: f64 = 20.0;

/// Pointer payload shared by the mouse commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pointer {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default)]
    pub button: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Pointer {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            x: None,
            y: None,
            button: 0,
            text: None,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn with_button(mut self, button: u8) -> Self {
        self.button = button;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Offset inside the element, present only when both coordinates are.
    pub fn offset(&self) -> Option<(f64, f64)> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }

    /// Same element and both axes strictly within [`MERGE_TOLERANCE_PX`].
    ///
    /// A pointer without coordinates is never near anything.
    pub fn is_near(&self, other: &Pointer) -> bool {
        if self.path != other.path {
            return false;
        }
        match (self.offset(), other.offset()) {
            (Some((x1, y1)), Some((x2, y2))) => {
                (x1 - x2).abs() < MERGE_TOLERANCE_PX && (y1 - y2).abs() < MERGE_TOLERANCE_PX
            }
            _ => false,
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }
}

/// A located element plus its optional caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRef {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ElementRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: None,
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectBy {
    Index,
    Value,
    #[serde(alias = "text")]
    Label,
}

impl SelectBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Value => "value",
            Self::Label => "label",
        }
    }
}

/// Dropdown selection criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(rename = "type")]
    pub by: SelectBy,
    pub value: String,
}

/// What an `expect` action fetches before comparing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectTarget {
    Value { path: String },
    Text { path: String },
    Displayed { path: String },
    Enabled { path: String },
    Selected { path: String },
    Attribute { path: String, name: String },
    Css { path: String, name: String },
    Url,
    Title,
    Cookie { name: String },
    LocalStorage { key: String },
    SessionStorage { key: String },
}

impl ExpectTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Value { .. } => "val",
            Self::Text { .. } => "text",
            Self::Displayed { .. } => "displayed",
            Self::Enabled { .. } => "enabled",
            Self::Selected { .. } => "selected",
            Self::Attribute { .. } => "attr",
            Self::Css { .. } => "css",
            Self::Url => "url",
            Self::Title => "title",
            Self::Cookie { .. } => "cookie",
            Self::LocalStorage { .. } => "localStorage",
            Self::SessionStorage { .. } => "sessionStorage",
        }
    }

    /// Locator of the element the value is read from, for element targets.
    pub fn element_path(&self) -> Option<&str> {
        match self {
            Self::Value { path }
            | Self::Text { path }
            | Self::Displayed { path }
            | Self::Enabled { path }
            | Self::Selected { path }
            | Self::Attribute { path, .. }
            | Self::Css { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Positional parameters in the front-end's wire order.
    pub fn params(&self) -> Vec<&str> {
        match self {
            Self::Value { path }
            | Self::Text { path }
            | Self::Displayed { path }
            | Self::Enabled { path }
            | Self::Selected { path } => vec![path],
            Self::Attribute { path, name } | Self::Css { path, name } => vec![path, name],
            Self::Url | Self::Title => vec![],
            Self::Cookie { name } => vec![name],
            Self::LocalStorage { key } | Self::SessionStorage { key } => vec![key],
        }
    }

    pub fn from_parts(kind: &str, params: &[String]) -> Result<Self> {
        let param = |index: usize| -> Result<String> {
            params.get(index).cloned().ok_or_else(|| {
                CoreError::invalid_data("expect", format!("{kind} needs parameter {}", index + 1))
            })
        };

        let target = match kind {
            "val" | "value" => Self::Value { path: param(0)? },
            "text" => Self::Text { path: param(0)? },
            "displayed" => Self::Displayed { path: param(0)? },
            "enabled" => Self::Enabled { path: param(0)? },
            "selected" => Self::Selected { path: param(0)? },
            "attr" | "attribute" => Self::Attribute {
                path: param(0)?,
                name: param(1)?,
            },
            "css" => Self::Css {
                path: param(0)?,
                name: param(1)?,
            },
            "url" => Self::Url,
            "title" => Self::Title,
            "cookie" => Self::Cookie { name: param(0)? },
            "localStorage" => Self::LocalStorage { key: param(0)? },
            "sessionStorage" => Self::SessionStorage { key: param(0)? },
            other => {
                return Err(CoreError::invalid_data(
                    "expect",
                    format!("unknown expectation type `{other}`"),
                ))
            }
        };
        Ok(target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Equal,
    Contain,
    Regexp,
}

impl Comparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Contain => "contain",
            Self::Regexp => "regexp",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "equal" => Some(Self::Equal),
            "contain" | "contains" => Some(Self::Contain),
            "regexp" | "match" => Some(Self::Regexp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    pub target: ExpectTarget,
    pub comparator: Comparator,
    pub expected: String,
}

/// Where a `setVar` action takes the value it types into the element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarSource {
    Variable { name: String },
    Faker { locale: String, pattern: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Url { url: String },
    CloseWindow,
    Sleep { time: u64 },
    WaitBody,
    MouseMove(Pointer),
    MouseDown(Pointer),
    MouseUp(Pointer),
    Click(Pointer),
    DblClick(Pointer),
    TouchClick(ElementRef),
    SendKeys { keys: String },
    KeyDown { character: String },
    KeyUp { character: String },
    ScrollTo { x: f64, y: f64 },
    Select { target: ElementRef, option: SelectOption },
    AcceptAlert,
    DismissAlert,
    SetAlert { text: String },
    UploadFile { target: ElementRef, filename: String },
    Expect(Expectation),
    SetVar { target: ElementRef, source: VarSource },
    Module { name: String },
}

impl Action {
    pub fn cmd(&self) -> &'static str {
        match self {
            Self::Url { .. } => "url",
            Self::CloseWindow => "closeWindow",
            Self::Sleep { .. } => "sleep",
            Self::WaitBody => "waitBody",
            Self::MouseMove(_) => "mouseMove",
            Self::MouseDown(_) => "mouseDown",
            Self::MouseUp(_) => "mouseUp",
            Self::Click(_) => "click",
            Self::DblClick(_) => "dblClick",
            Self::TouchClick(_) => "touchClick",
            Self::SendKeys { .. } => "sendKeys",
            Self::KeyDown { .. } => "keyDown",
            Self::KeyUp { .. } => "keyUp",
            Self::ScrollTo { .. } => "scrollTo",
            Self::Select { .. } => "select",
            Self::AcceptAlert => "acceptAlert",
            Self::DismissAlert => "dismissAlert",
            Self::SetAlert { .. } => "setAlert",
            Self::UploadFile { .. } => "uploadFile",
            Self::Expect(_) => "expect",
            Self::SetVar { .. } => "setVar",
            Self::Module { .. } => "module",
        }
    }

    pub fn pointer(&self) -> Option<&Pointer> {
        match self {
            Self::MouseMove(p)
            | Self::MouseDown(p)
            | Self::MouseUp(p)
            | Self::Click(p)
            | Self::DblClick(p) => Some(p),
            _ => None,
        }
    }

    pub fn decode(cmd: &str, data: Value) -> Result<Self> {
        let action = match cmd {
            "url" => Self::Url {
                url: payload::<UrlData>(cmd, data)?.url,
            },
            "closeWindow" => Self::CloseWindow,
            "sleep" => Self::Sleep {
                time: payload::<SleepData>(cmd, data)?.time,
            },
            "waitBody" => Self::WaitBody,
            "mouseMove" => Self::MouseMove(payload(cmd, data)?),
            "mouseDown" => Self::MouseDown(payload(cmd, data)?),
            "mouseUp" => Self::MouseUp(payload(cmd, data)?),
            "click" => Self::Click(payload(cmd, data)?),
            "dblClick" => Self::DblClick(payload(cmd, data)?),
            "touchClick" => Self::TouchClick(payload(cmd, data)?),
            "sendKeys" => Self::SendKeys {
                keys: payload::<KeysData>(cmd, data)?.keys,
            },
            "keyDown" => Self::KeyDown {
                character: payload::<CharacterData>(cmd, data)?.character,
            },
            "keyUp" => Self::KeyUp {
                character: payload::<CharacterData>(cmd, data)?.character,
            },
            "scrollTo" => {
                let scroll: ScrollData = payload(cmd, data)?;
                Self::ScrollTo {
                    x: scroll.x,
                    y: scroll.y,
                }
            }
            "select" => {
                let select: SelectData = payload(cmd, data)?;
                Self::Select {
                    target: ElementRef {
                        path: select.path,
                        text: select.text,
                    },
                    option: SelectOption {
                        by: select.by,
                        value: value_to_string(&select.value),
                    },
                }
            }
            "acceptAlert" => Self::AcceptAlert,
            "dismissAlert" => Self::DismissAlert,
            "setAlert" => Self::SetAlert {
                text: payload::<AlertData>(cmd, data)?.text,
            },
            "uploadFile" => {
                let upload: UploadData = payload(cmd, data)?;
                Self::UploadFile {
                    target: ElementRef {
                        path: upload.path,
                        text: upload.text,
                    },
                    filename: upload.filename,
                }
            }
            "expect" => Self::Expect(decode_expectation(data)?),
            "setVar" => decode_set_var(data)?,
            "module" => Self::Module {
                name: decode_module_name(data)?,
            },
            other => return Err(CoreError::UnknownCommand(other.to_string())),
        };
        Ok(action)
    }

    /// Wire `data` object for this action; `decode(cmd(), data())` round-trips.
    pub fn data(&self) -> Value {
        match self {
            Self::Url { url } => json!({ "url": url }),
            Self::CloseWindow
            | Self::WaitBody
            | Self::AcceptAlert
            | Self::DismissAlert => json!({}),
            Self::Sleep { time } => json!({ "time": time }),
            Self::MouseMove(p)
            | Self::MouseDown(p)
            | Self::MouseUp(p)
            | Self::Click(p)
            | Self::DblClick(p) => serde_json::to_value(p).unwrap_or_default(),
            Self::TouchClick(target) => serde_json::to_value(target).unwrap_or_default(),
            Self::SendKeys { keys } => json!({ "keys": keys }),
            Self::KeyDown { character } | Self::KeyUp { character } => {
                json!({ "character": character })
            }
            Self::ScrollTo { x, y } => json!({ "x": x, "y": y }),
            Self::Select { target, option } => json!({
                "path": target.path,
                "text": target.text,
                "type": option.by.as_str(),
                "value": option.value,
            }),
            Self::SetAlert { text } => json!({ "text": text }),
            Self::UploadFile { target, filename } => json!({
                "path": target.path,
                "text": target.text,
                "filename": filename,
            }),
            Self::Expect(expectation) => json!({
                "type": expectation.target.kind(),
                "params": expectation.target.params(),
                "compare": expectation.comparator.as_str(),
                "to": expectation.expected,
            }),
            Self::SetVar { target, source } => {
                let varinfo = match source {
                    VarSource::Variable { name } => json!({ "type": "var", "name": name }),
                    VarSource::Faker { locale, pattern } => {
                        json!({ "type": "faker", "lang": locale, "str": pattern })
                    }
                };
                json!({ "path": target.path, "text": target.text, "varinfo": varinfo })
            }
            Self::Module { name } => Value::String(name.clone()),
        }
    }
}

/// Normalizer output: an action tagged with the window and frame it happened in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEvent", into = "RawEvent")]
pub struct SemanticAction {
    pub window: i64,
    pub frame: Option<String>,
    pub action: Action,
}

impl SemanticAction {
    pub fn new(window: i64, frame: Option<String>, action: Action) -> Self {
        Self {
            window,
            frame,
            action,
        }
    }

    pub fn cmd(&self) -> &'static str {
        self.action.cmd()
    }

    pub fn with_action(self, action: Action) -> Self {
        Self { action, ..self }
    }

    /// Same window, same frame and pointers near each other.
    pub fn is_mergeable_with(&self, other: &SemanticAction) -> bool {
        if self.window != other.window || self.frame != other.frame {
            return false;
        }
        match (self.action.pointer(), other.action.pointer()) {
            (Some(a), Some(b)) => a.is_near(b),
            _ => false,
        }
    }
}

impl TryFrom<RawEvent> for SemanticAction {
    type Error = CoreError;

    fn try_from(raw: RawEvent) -> Result<Self> {
        let action = Action::decode(&raw.cmd, raw.data)?;
        Ok(Self::new(raw.window, raw.frame, action))
    }
}

impl From<SemanticAction> for RawEvent {
    fn from(action: SemanticAction) -> Self {
        RawEvent::new(
            action.window,
            action.frame,
            action.action.cmd(),
            action.action.data(),
        )
    }
}

#[derive(Deserialize)]
struct UrlData {
    url: String,
}

#[derive(Deserialize)]
struct SleepData {
    time: u64,
}

#[derive(Deserialize)]
struct KeysData {
    keys: String,
}

#[derive(Deserialize)]
struct CharacterData {
    character: String,
}

#[derive(Deserialize)]
struct ScrollData {
    x: f64,
    y: f64,
}

#[derive(Deserialize)]
struct SelectData {
    path: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(rename = "type")]
    by: SelectBy,
    value: Value,
}

#[derive(Deserialize)]
struct AlertData {
    text: String,
}

#[derive(Deserialize)]
struct UploadData {
    path: String,
    #[serde(default)]
    text: Option<String>,
    filename: String,
}

#[derive(Deserialize)]
struct ExpectData {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    params: Vec<Value>,
    compare: String,
    to: Value,
}

#[derive(Deserialize)]
struct SetVarData {
    path: String,
    #[serde(default)]
    text: Option<String>,
    varinfo: VarInfo,
}

#[derive(Deserialize)]
struct VarInfo {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    lang: Option<String>,
    #[serde(default, rename = "str")]
    pattern: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

fn payload<T: DeserializeOwned>(cmd: &str, data: Value) -> Result<T> {
    serde_json::from_value(data).map_err(|e| CoreError::invalid_data(cmd, e.to_string()))
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn decode_expectation(data: Value) -> Result<Expectation> {
    let raw: ExpectData = payload("expect", data)?;
    let params: Vec<String> = raw.params.iter().map(value_to_string).collect();
    let target = ExpectTarget::from_parts(&raw.kind, &params)?;
    let comparator = Comparator::parse(&raw.compare).ok_or_else(|| {
        CoreError::invalid_data("expect", format!("unknown comparator `{}`", raw.compare))
    })?;

    Ok(Expectation {
        target,
        comparator,
        expected: value_to_string(&raw.to),
    })
}

fn decode_set_var(data: Value) -> Result<Action> {
    let raw: SetVarData = payload("setVar", data)?;
    let info = raw.varinfo;
    let source = if info.kind.as_deref() == Some("faker") {
        VarSource::Faker {
            locale: info.lang.unwrap_or_else(|| "en".to_string()),
            pattern: info
                .pattern
                .ok_or_else(|| CoreError::invalid_data("setVar", "faker needs `str`"))?,
        }
    } else {
        VarSource::Variable {
            name: info
                .name
                .ok_or_else(|| CoreError::invalid_data("setVar", "variable needs `name`"))?,
        }
    };

    Ok(Action::SetVar {
        target: ElementRef {
            path: raw.path,
            text: raw.text,
        },
        source,
    })
}

fn decode_module_name(data: Value) -> Result<String> {
    let name = match data {
        Value::String(name) => name,
        Value::Object(mut map) => match map.remove("file").or_else(|| map.remove("name")) {
            Some(Value::String(name)) => name,
            _ => return Err(CoreError::invalid_data("module", "missing module file")),
        },
        _ => return Err(CoreError::invalid_data("module", "expected module file name")),
    };

    if name.is_empty() {
        return Err(CoreError::invalid_data("module", "empty module file name"));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click_at(path: &str, x: f64, y: f64) -> Pointer {
        Pointer::new(path).at(x, y)
    }

    #[test]
    fn test_pointer_is_near() {
        let a = click_at("#a", 10.0, 10.0);

        assert!(a.is_near(&click_at("#a", 12.0, 11.0)));
        assert!(a.is_near(&click_at("#a", 29.9, -9.9)));
        assert!(!a.is_near(&click_at("#a", 30.0, 10.0)));
        assert!(!a.is_near(&click_at("#a", 10.0, -10.0)));
        assert!(!a.is_near(&click_at("#b", 10.0, 10.0)));
        assert!(!a.is_near(&Pointer::new("#a")));
    }

    #[test]
    fn test_semantic_action_mergeable_requires_same_frame() {
        let a = SemanticAction::new(0, None, Action::MouseDown(click_at("#a", 1.0, 1.0)));
        let b = SemanticAction::new(0, None, Action::MouseUp(click_at("#a", 2.0, 2.0)));
        let framed = SemanticAction::new(
            0,
            Some("#frame".to_string()),
            Action::MouseUp(click_at("#a", 2.0, 2.0)),
        );
        let other_window = SemanticAction::new(1, None, Action::MouseUp(click_at("#a", 2.0, 2.0)));

        assert!(a.is_mergeable_with(&b));
        assert!(!a.is_mergeable_with(&framed));
        assert!(!a.is_mergeable_with(&other_window));
    }

    #[test]
    fn test_decode_pointer_defaults() {
        let action = Action::decode("click", json!({ "path": "#btn", "x": 3, "y": 4 })).unwrap();

        match action {
            Action::Click(pointer) => {
                assert_eq!(pointer.path, "#btn");
                assert_eq!(pointer.offset(), Some((3.0, 4.0)));
                assert_eq!(pointer.button, 0);
                assert!(pointer.label().is_none());
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_decode_expect() {
        let data = json!({
            "type": "attr",
            "params": ["#a", "href"],
            "compare": "contain",
            "to": "example"
        });
        let action = Action::decode("expect", data).unwrap();

        assert_eq!(
            action,
            Action::Expect(Expectation {
                target: ExpectTarget::Attribute {
                    path: "#a".to_string(),
                    name: "href".to_string(),
                },
                comparator: Comparator::Contain,
                expected: "example".to_string(),
            })
        );
    }

    #[test]
    fn test_decode_expect_missing_param() {
        let data = json!({ "type": "css", "params": ["#a"], "compare": "equal", "to": "x" });
        assert!(matches!(
            Action::decode("expect", data),
            Err(CoreError::InvalidData { .. })
        ));
    }

    #[test]
    fn test_decode_expect_boolean_target_value() {
        let data = json!({ "type": "displayed", "params": ["#a"], "compare": "equal", "to": true });
        match Action::decode("expect", data).unwrap() {
            Action::Expect(expectation) => assert_eq!(expectation.expected, "true"),
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_decode_set_var_sources() {
        let faker = json!({
            "path": "#name",
            "varinfo": { "type": "faker", "lang": "zh_CN", "str": "{{name.firstName}}" }
        });
        let variable = json!({ "path": "#name", "varinfo": { "name": "user" } });

        assert!(matches!(
            Action::decode("setVar", faker).unwrap(),
            Action::SetVar {
                source: VarSource::Faker { .. },
                ..
            }
        ));
        assert!(matches!(
            Action::decode("setVar", variable).unwrap(),
            Action::SetVar {
                source: VarSource::Variable { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_decode_module_forms() {
        assert_eq!(
            Action::decode("module", json!("login.actions.json")).unwrap(),
            Action::Module {
                name: "login.actions.json".to_string()
            }
        );
        assert_eq!(
            Action::decode("module", json!({ "file": "a.json" })).unwrap(),
            Action::Module {
                name: "a.json".to_string()
            }
        );
        assert!(Action::decode("module", json!("")).is_err());
    }

    #[test]
    fn test_decode_unknown_command() {
        assert!(matches!(
            Action::decode("hover", Value::Null),
            Err(CoreError::UnknownCommand(cmd)) if cmd == "hover"
        ));
    }

    #[test]
    fn test_unit_commands_ignore_data() {
        assert_eq!(
            Action::decode("acceptAlert", json!({ "anything": 1 })).unwrap(),
            Action::AcceptAlert
        );
    }

    #[test]
    fn test_semantic_action_wire_form() {
        let action = SemanticAction::new(
            2,
            Some("#frame".to_string()),
            Action::Select {
                target: ElementRef::new("#sel"),
                option: SelectOption {
                    by: SelectBy::Index,
                    value: "3".to_string(),
                },
            },
        );

        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["cmd"], "select");
        assert_eq!(json["data"]["type"], "index");

        let back: SemanticAction = serde_json::from_value(json).unwrap();
        assert_eq!(back, action);
    }
}
