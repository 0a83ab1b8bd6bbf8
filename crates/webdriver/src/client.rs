use std::time::Duration;

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::{Result, WebDriverError};
use crate::types::{element_ref, ErrorValue, Locator, NewSession, Rect, SessionOptions, ELEMENT_KEY};

/// One remote browser session spoken to over the W3C WebDriver protocol.
pub struct WebDriverSession {
    base_url: String,
    session_id: String,
    client: Client,
    poll_interval: Duration,
}

impl WebDriverSession {
    /// Open a new browser session on the WebDriver endpoint at `base_url`.
    pub async fn connect(base_url: impl Into<String>, options: SessionOptions) -> Result<Self> {
        Self::connect_with_client(base_url, options, Client::new()).await
    }

    pub async fn connect_with_client(
        base_url: impl Into<String>,
        options: SessionOptions,
        client: Client,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let response = client
            .post(format!("{}/session", base_url))
            .json(&options.capabilities())
            .send()
            .await?;

        let created: NewSession = handle_response(response).await.map_err(|e| match e {
            WebDriverError::Protocol { message, .. } => WebDriverError::SessionNotCreated(message),
            other => other,
        })?;

        tracing::info!(
            session_id = %created.session_id,
            browser = %created.capabilities["browserName"].as_str().unwrap_or("unknown"),
            "WebDriver session created"
        );

        Ok(Self {
            base_url,
            session_id: created.session_id,
            client,
            poll_interval: options.poll_interval,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    async fn command<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T> {
        let url = format!("{}/session/{}{}", self.base_url, self.session_id, path);
        tracing::trace!(%method, %url, "WebDriver command");

        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(&body);
        } else if method == Method::POST {
            request = request.json(&json!({}));
        }

        handle_response(request.send().await?).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        self.command(Method::POST, path, Some(body)).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.command(Method::GET, path, None).await
    }

    pub async fn delete_session(&self) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/session/{}", self.base_url, self.session_id))
            .send()
            .await?;
        let _: Value = handle_response(response).await?;
        tracing::info!(session_id = %self.session_id, "WebDriver session deleted");
        Ok(())
    }

    pub async fn navigate_to(&self, url: &str) -> Result<()> {
        self.post("/url", json!({ "url": url })).await?;
        Ok(())
    }

    pub async fn get_current_url(&self) -> Result<String> {
        self.get("/url").await
    }

    pub async fn get_title(&self) -> Result<String> {
        self.get("/title").await
    }

    pub async fn close_current_window(&self) -> Result<()> {
        let _: Value = self.command(Method::DELETE, "/window", None).await?;
        Ok(())
    }

    pub async fn window_handles(&self) -> Result<Vec<String>> {
        self.get("/window/handles").await
    }

    pub async fn switch_to_window(&self, handle: &str) -> Result<()> {
        self.post("/window", json!({ "handle": handle })).await?;
        Ok(())
    }

    /// `None` selects the top-level browsing context.
    pub async fn switch_to_frame(&self, element_id: Option<&str>) -> Result<()> {
        let id = element_id.map(element_ref).unwrap_or(Value::Null);
        self.post("/frame", json!({ "id": id })).await?;
        Ok(())
    }

    pub async fn window_rect(&self) -> Result<Value> {
        self.get("/window/rect").await
    }

    pub async fn maximize_window(&self) -> Result<()> {
        self.post("/window/maximize", json!({})).await?;
        Ok(())
    }

    /// Single lookup without waiting.
    pub async fn find_element(&self, path: &str) -> Result<String> {
        let locator = serde_json::to_value(Locator::parse(path))?;
        let found = self.post("/element", locator).await?;
        found
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| WebDriverError::InvalidResponse(format!("no element reference in {found}")))
    }

    pub async fn element_property(&self, id: &str, name: &str) -> Result<Value> {
        self.get(&format!("/element/{id}/property/{name}")).await
    }

    pub async fn get_element_attribute(&self, id: &str, name: &str) -> Result<Option<String>> {
        self.get(&format!("/element/{id}/attribute/{name}")).await
    }

    pub async fn element_css_value(&self, id: &str, name: &str) -> Result<String> {
        self.get(&format!("/element/{id}/css/{name}")).await
    }

    pub async fn get_element_text(&self, id: &str) -> Result<String> {
        self.get(&format!("/element/{id}/text")).await
    }

    pub async fn element_flag(&self, id: &str, flag: &str) -> Result<bool> {
        self.get(&format!("/element/{id}/{flag}")).await
    }

    pub(crate) async fn element_rect(&self, id: &str) -> Result<Rect> {
        self.get(&format!("/element/{id}/rect")).await
    }

    pub async fn element_clear(&self, id: &str) -> Result<()> {
        self.post(&format!("/element/{id}/clear"), json!({})).await?;
        Ok(())
    }

    pub async fn element_send_keys(&self, id: &str, text: &str) -> Result<()> {
        self.post(&format!("/element/{id}/value"), json!({ "text": text }))
            .await?;
        Ok(())
    }

    pub async fn perform_actions(&self, actions: Value) -> Result<()> {
        self.post("/actions", json!({ "actions": [actions] })).await?;
        Ok(())
    }

    pub async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.post("/execute/sync", json!({ "script": script, "args": args }))
            .await
    }

    pub async fn alert_accept(&self) -> Result<()> {
        self.post("/alert/accept", json!({})).await?;
        Ok(())
    }

    pub async fn alert_dismiss(&self) -> Result<()> {
        self.post("/alert/dismiss", json!({})).await?;
        Ok(())
    }

    pub async fn alert_send_text(&self, text: &str) -> Result<()> {
        self.post("/alert/text", json!({ "text": text })).await?;
        Ok(())
    }

    /// Value of the named cookie, `None` if it is not set.
    pub async fn cookie_value(&self, name: &str) -> Result<Option<String>> {
        match self.get::<Value>(&format!("/cookie/{name}")).await {
            Ok(cookie) => Ok(cookie["value"].as_str().map(str::to_string)),
            Err(e) if e.code() == Some("no such cookie") => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for WebDriverSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDriverSession")
            .field("base_url", &self.base_url)
            .field("session_id", &self.session_id)
            .finish()
    }
}

/// Unwrap the `value` member of a W3C response, or its error object.
async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body: Value = match response.json().await {
        Ok(body) => body,
        Err(e) if status.is_success() => return Err(e.into()),
        Err(_) => {
            return Err(WebDriverError::InvalidResponse(format!(
                "Status {} with non-JSON body",
                status
            )))
        }
    };
    let value = body.get("value").cloned().unwrap_or(Value::Null);

    if !status.is_success() {
        let ErrorValue { error, message } = serde_json::from_value(value).map_err(|_| {
            WebDriverError::InvalidResponse(format!("Status {}: {}", status, body))
        })?;
        tracing::debug!(status = status.as_u16(), %error, "WebDriver command failed");
        return Err(WebDriverError::Protocol {
            status: status.as_u16(),
            error,
            message,
        });
    }

    Ok(serde_json::from_value(value)?)
}
