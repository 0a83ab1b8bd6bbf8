use std::time::Duration;

use recorder_core::{AutomationSession, SelectBy, SelectOption, SessionError, WaitOptions};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use webdriver::{SessionOptions, WebDriverError, WebDriverSession, ELEMENT_KEY};

const SID: &str = "sess-1";

async fn connected(mock: &MockServer) -> WebDriverSession {
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": {
                "sessionId": SID,
                "capabilities": { "browserName": "chrome" }
            }
        })))
        .mount(mock)
        .await;

    let options = SessionOptions::default().with_poll_interval(Duration::from_millis(10));
    WebDriverSession::connect(mock.uri(), options).await.unwrap()
}

fn ok(value: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "value": value }))
}

fn w3c_error(status: u16, error: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "value": { "error": error, "message": format!("{error} happened"), "stacktrace": "" }
    }))
}

#[tokio::test]
async fn test_connect_reads_session_id() {
    let mock = MockServer::start().await;
    let session = connected(&mock).await;

    assert_eq!(session.session_id(), SID);
}

#[tokio::test]
async fn test_connect_failure_is_session_not_created() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(w3c_error(500, "session not created"))
        .mount(&mock)
        .await;

    let err = WebDriverSession::connect(mock.uri(), SessionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WebDriverError::SessionNotCreated(m) if m.contains("session not created")));
}

#[tokio::test]
async fn test_navigate_posts_url() {
    let mock = MockServer::start().await;
    let session = connected(&mock).await;

    Mock::given(method("POST"))
        .and(path(format!("/session/{SID}/url")))
        .and(body_json(json!({ "url": "http://example.test/" })))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&mock)
        .await;

    session.navigate("http://example.test/").await.unwrap();
}

#[tokio::test]
async fn test_wait_for_returns_visible_element() {
    let mock = MockServer::start().await;
    let session = connected(&mock).await;

    Mock::given(method("POST"))
        .and(path(format!("/session/{SID}/element")))
        .and(body_partial_json(json!({ "using": "css selector", "value": "#login" })))
        .respond_with(ok(json!({ ELEMENT_KEY: "el-7" })))
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/session/{SID}/element/el-7/displayed")))
        .respond_with(ok(json!(true)))
        .mount(&mock)
        .await;

    let handle = session
        .wait_for("#login", WaitOptions::new(Duration::from_millis(200)))
        .await
        .unwrap();
    assert_eq!(handle.id(), "el-7");
}

#[tokio::test]
async fn test_wait_for_missing_element_is_not_found() {
    let mock = MockServer::start().await;
    let session = connected(&mock).await;

    Mock::given(method("POST"))
        .and(path(format!("/session/{SID}/element")))
        .respond_with(w3c_error(404, "no such element"))
        .mount(&mock)
        .await;

    let err = session
        .wait_for("#missing", WaitOptions::new(Duration::from_millis(50)))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NotFound(l) if l == "#missing"));
}

#[tokio::test]
async fn test_wait_for_hidden_element_times_out_unless_hidden_ok() {
    let mock = MockServer::start().await;
    let session = connected(&mock).await;

    Mock::given(method("POST"))
        .and(path(format!("/session/{SID}/element")))
        .respond_with(ok(json!({ ELEMENT_KEY: "file-1" })))
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/session/{SID}/element/file-1/displayed")))
        .respond_with(ok(json!(false)))
        .mount(&mock)
        .await;

    let err = session
        .wait_for("input[type=file]", WaitOptions::new(Duration::from_millis(50)))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Timeout { .. }));

    let handle = session
        .wait_for(
            "input[type=file]",
            WaitOptions::new(Duration::from_millis(50)).hidden_ok(),
        )
        .await
        .unwrap();
    assert_eq!(handle.id(), "file-1");
}

#[tokio::test]
async fn test_switch_window_by_index() {
    let mock = MockServer::start().await;
    let session = connected(&mock).await;

    Mock::given(method("GET"))
        .and(path(format!("/session/{SID}/window/handles")))
        .respond_with(ok(json!(["w-0", "w-1"])))
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/session/{SID}/window")))
        .and(body_json(json!({ "handle": "w-1" })))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&mock)
        .await;

    session.switch_window(1).await.unwrap();

    let err = session.switch_window(5).await.unwrap_err();
    assert!(matches!(err, SessionError::NoSuchWindow(_)));
}

#[tokio::test]
async fn test_switch_frame_to_top() {
    let mock = MockServer::start().await;
    let session = connected(&mock).await;

    Mock::given(method("POST"))
        .and(path(format!("/session/{SID}/frame")))
        .and(body_json(json!({ "id": null })))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&mock)
        .await;

    session.switch_frame(None).await.unwrap();
}

#[tokio::test]
async fn test_missing_cookie_is_none() {
    let mock = MockServer::start().await;
    let session = connected(&mock).await;

    Mock::given(method("GET"))
        .and(path(format!("/session/{SID}/cookie/token")))
        .respond_with(w3c_error(404, "no such cookie"))
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/session/{SID}/cookie/lang")))
        .respond_with(ok(json!({ "name": "lang", "value": "en" })))
        .mount(&mock)
        .await;

    assert_eq!(session.cookie("token").await.unwrap(), None);
    assert_eq!(session.cookie("lang").await.unwrap().as_deref(), Some("en"));
}

#[tokio::test]
async fn test_accept_alert_without_alert() {
    let mock = MockServer::start().await;
    let session = connected(&mock).await;

    Mock::given(method("POST"))
        .and(path(format!("/session/{SID}/alert/accept")))
        .respond_with(w3c_error(404, "no such alert"))
        .mount(&mock)
        .await;

    let err = session.accept_alert().await.unwrap_err();
    assert!(matches!(err, SessionError::NoSuchAlert));
}

#[tokio::test]
async fn test_select_reports_missing_option() {
    let mock = MockServer::start().await;
    let session = connected(&mock).await;

    Mock::given(method("POST"))
        .and(path(format!("/session/{SID}/execute/sync")))
        .respond_with(ok(json!(false)))
        .mount(&mock)
        .await;

    let option = SelectOption {
        by: SelectBy::Value,
        value: "nope".to_string(),
    };
    let element = recorder_core::ElementHandle::new("sel-1");
    let err = session.select(&element, &option).await.unwrap_err();
    assert!(matches!(err, SessionError::NotFound(m) if m == "option value=nope"));
}

#[tokio::test]
async fn test_maximize_window() {
    let mock = MockServer::start().await;
    let session = connected(&mock).await;

    Mock::given(method("POST"))
        .and(path(format!("/session/{SID}/window/maximize")))
        .respond_with(ok(json!({ "x": 0, "y": 0, "width": 1920, "height": 1080 })))
        .expect(1)
        .mount(&mock)
        .await;

    session.maximize_window().await.unwrap();
}

#[tokio::test]
async fn test_close_deletes_session() {
    let mock = MockServer::start().await;
    let session = connected(&mock).await;

    Mock::given(method("DELETE"))
        .and(path(format!("/session/{SID}")))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&mock)
        .await;

    session.close().await.unwrap();
}
