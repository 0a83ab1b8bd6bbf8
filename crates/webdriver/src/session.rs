use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::Instant;

use recorder_core::{
    AutomationSession, ElementHandle, KeyDirection, SelectOption, SessionError, SessionResult,
    WaitOptions,
};

use crate::client::WebDriverSession;
use crate::keys::{expand_keys, resolve_key};
use crate::types::element_ref;

const SELECT_OPTION_SCRIPT: &str = r#"
var select = arguments[0], by = arguments[1], wanted = String(arguments[2]);
for (var i = 0; i < select.options.length; i++) {
    var option = select.options[i];
    var hit = by === 'index' ? String(i) === wanted
        : by === 'value' ? option.value === wanted
        : option.text === wanted;
    if (hit) {
        select.selectedIndex = i;
        select.dispatchEvent(new Event('change', { bubbles: true }));
        return true;
    }
}
return false;
"#;

fn pointer(id: &str, kind: &str, actions: Vec<Value>) -> Value {
    json!({
        "type": "pointer",
        "id": id,
        "parameters": { "pointerType": kind },
        "actions": actions,
    })
}

fn press(button: u8) -> [Value; 2] {
    [
        json!({ "type": "pointerDown", "button": button }),
        json!({ "type": "pointerUp", "button": button }),
    ]
}

impl WebDriverSession {
    async fn storage_item(&self, area: &str, key: &str) -> SessionResult<Option<String>> {
        let script = format!("return window.{area}.getItem(arguments[0]);");
        let value = self.execute(&script, vec![json!(key)]).await?;
        Ok(value.as_str().map(str::to_string))
    }
}

#[async_trait]
impl AutomationSession for WebDriverSession {
    async fn navigate(&self, url: &str) -> SessionResult<()> {
        Ok(self.navigate_to(url).await?)
    }

    async fn close_window(&self) -> SessionResult<()> {
        Ok(self.close_current_window().await?)
    }

    async fn wait_for(&self, locator: &str, options: WaitOptions) -> SessionResult<ElementHandle> {
        let deadline = Instant::now() + options.timeout;
        let mut found_hidden = false;

        loop {
            match self.find_element(locator).await {
                Ok(id) => {
                    if !options.displayed || self.element_flag(&id, "displayed").await? {
                        return Ok(ElementHandle::new(id));
                    }
                    found_hidden = true;
                }
                Err(e) if e.is_no_such_element() => {}
                Err(e) => return Err(e.into()),
            }

            if Instant::now() >= deadline {
                tracing::debug!(locator, hidden = found_hidden, "Element wait expired");
                return Err(if found_hidden {
                    SessionError::timeout(locator, options.timeout)
                } else {
                    SessionError::NotFound(locator.to_string())
                });
            }
            tokio::time::sleep(self.poll_interval()).await;
        }
    }

    async fn move_to(
        &self,
        element: &ElementHandle,
        offset: Option<(f64, f64)>,
    ) -> SessionResult<()> {
        // Recorded offsets are from the top-left corner; W3C origins are the centre.
        let (x, y) = match offset {
            Some((x, y)) => {
                let rect = self.element_rect(element.id()).await?;
                (x - rect.width / 2.0, y - rect.height / 2.0)
            }
            None => (0.0, 0.0),
        };
        let action = json!({
            "type": "pointerMove",
            "duration": 0,
            "origin": element_ref(element.id()),
            "x": x.round() as i64,
            "y": y.round() as i64,
        });
        Ok(self
            .perform_actions(pointer("mouse", "mouse", vec![action]))
            .await?)
    }

    async fn pointer_down(&self, button: u8) -> SessionResult<()> {
        let action = json!({ "type": "pointerDown", "button": button });
        Ok(self
            .perform_actions(pointer("mouse", "mouse", vec![action]))
            .await?)
    }

    async fn pointer_up(&self, button: u8) -> SessionResult<()> {
        let action = json!({ "type": "pointerUp", "button": button });
        Ok(self
            .perform_actions(pointer("mouse", "mouse", vec![action]))
            .await?)
    }

    async fn click(&self, button: u8) -> SessionResult<()> {
        Ok(self
            .perform_actions(pointer("mouse", "mouse", press(button).to_vec()))
            .await?)
    }

    async fn double_click(&self) -> SessionResult<()> {
        let mut actions = press(0).to_vec();
        actions.extend(press(0));
        Ok(self
            .perform_actions(pointer("mouse", "mouse", actions))
            .await?)
    }

    async fn touch_tap(&self, element: &ElementHandle) -> SessionResult<()> {
        let mut actions = vec![json!({
            "type": "pointerMove",
            "duration": 0,
            "origin": element_ref(element.id()),
            "x": 0,
            "y": 0,
        })];
        actions.extend(press(0));
        Ok(self
            .perform_actions(pointer("finger", "touch", actions))
            .await?)
    }

    async fn send_keys(&self, text: &str) -> SessionResult<()> {
        let actions: Vec<Value> = expand_keys(text)
            .chars()
            .flat_map(|c| {
                let key = c.to_string();
                [
                    json!({ "type": "keyDown", "value": key }),
                    json!({ "type": "keyUp", "value": key }),
                ]
            })
            .collect();
        if actions.is_empty() {
            return Ok(());
        }
        Ok(self
            .perform_actions(json!({ "type": "key", "id": "keyboard", "actions": actions }))
            .await?)
    }

    async fn send_keys_to(&self, element: &ElementHandle, text: &str) -> SessionResult<()> {
        Ok(self.element_send_keys(element.id(), &expand_keys(text)).await?)
    }

    async fn key_event(&self, key: &str, direction: KeyDirection) -> SessionResult<()> {
        let code = resolve_key(key)
            .ok_or_else(|| SessionError::Unsupported(format!("unknown key '{key}'")))?;
        let kind = match direction {
            KeyDirection::Down => "keyDown",
            KeyDirection::Up => "keyUp",
        };
        let action = json!({ "type": kind, "value": code.to_string() });
        Ok(self
            .perform_actions(json!({ "type": "key", "id": "keyboard", "actions": [action] }))
            .await?)
    }

    async fn scroll_to(&self, x: f64, y: f64) -> SessionResult<()> {
        self.execute("window.scrollTo(arguments[0], arguments[1]);", vec![json!(x), json!(y)])
            .await?;
        Ok(())
    }

    async fn select(&self, element: &ElementHandle, option: &SelectOption) -> SessionResult<()> {
        let args = vec![
            element_ref(element.id()),
            json!(option.by.as_str()),
            json!(option.value),
        ];
        let selected = self.execute(SELECT_OPTION_SCRIPT, args).await?;
        if selected.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(SessionError::NotFound(format!(
                "option {}={}",
                option.by.as_str(),
                option.value
            )))
        }
    }

    async fn accept_alert(&self) -> SessionResult<()> {
        Ok(self.alert_accept().await?)
    }

    async fn dismiss_alert(&self) -> SessionResult<()> {
        Ok(self.alert_dismiss().await?)
    }

    async fn set_alert_text(&self, text: &str) -> SessionResult<()> {
        Ok(self.alert_send_text(text).await?)
    }

    async fn element_value(&self, element: &ElementHandle) -> SessionResult<String> {
        let value = self.element_property(element.id(), "value").await?;
        Ok(match value {
            Value::Null => String::new(),
            Value::String(s) => s,
            other => other.to_string(),
        })
    }

    async fn set_element_value(&self, element: &ElementHandle, value: &str) -> SessionResult<()> {
        self.element_clear(element.id()).await?;
        Ok(self.element_send_keys(element.id(), value).await?)
    }

    async fn element_text(&self, element: &ElementHandle) -> SessionResult<String> {
        Ok(self.get_element_text(element.id()).await?)
    }

    async fn element_displayed(&self, element: &ElementHandle) -> SessionResult<bool> {
        Ok(self.element_flag(element.id(), "displayed").await?)
    }

    async fn element_enabled(&self, element: &ElementHandle) -> SessionResult<bool> {
        Ok(self.element_flag(element.id(), "enabled").await?)
    }

    async fn element_selected(&self, element: &ElementHandle) -> SessionResult<bool> {
        Ok(self.element_flag(element.id(), "selected").await?)
    }

    async fn element_attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> SessionResult<Option<String>> {
        Ok(self.get_element_attribute(element.id(), name).await?)
    }

    async fn element_css(&self, element: &ElementHandle, property: &str) -> SessionResult<String> {
        Ok(self.element_css_value(element.id(), property).await?)
    }

    async fn current_url(&self) -> SessionResult<String> {
        Ok(self.get_current_url().await?)
    }

    async fn title(&self) -> SessionResult<String> {
        Ok(self.get_title().await?)
    }

    async fn cookie(&self, name: &str) -> SessionResult<Option<String>> {
        Ok(self.cookie_value(name).await?)
    }

    async fn local_storage(&self, key: &str) -> SessionResult<Option<String>> {
        self.storage_item("localStorage", key).await
    }

    async fn session_storage(&self, key: &str) -> SessionResult<Option<String>> {
        self.storage_item("sessionStorage", key).await
    }

    async fn switch_window(&self, index: i64) -> SessionResult<()> {
        let handles = self.window_handles().await?;
        let handle = usize::try_from(index)
            .ok()
            .and_then(|i| handles.get(i))
            .ok_or_else(|| {
                SessionError::NoSuchWindow(format!("index {index} of {} windows", handles.len()))
            })?;
        Ok(self.switch_to_window(handle).await?)
    }

    async fn switch_frame(&self, element: Option<&ElementHandle>) -> SessionResult<()> {
        Ok(self.switch_to_frame(element.map(ElementHandle::id)).await?)
    }

    async fn probe(&self) -> SessionResult<()> {
        self.window_rect().await?;
        Ok(())
    }

    async fn wait_ready(&self, timeout: Duration) -> SessionResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let state = self.execute("return document.readyState;", Vec::new()).await?;
            if state.as_str() == Some("complete") {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SessionError::timeout("document ready", timeout));
            }
            tokio::time::sleep(self.poll_interval()).await;
        }
    }

    async fn close(&self) -> SessionResult<()> {
        Ok(self.delete_session().await?)
    }
}
