use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assistant_client::api::{ApiError, Backend, HttpBackend, ListenOptions, ReminderId};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

#[derive(Default)]
struct Recorded {
    requests: Mutex<Vec<String>>,
    commands: Mutex<Vec<String>>,
    polls: AtomicUsize,
    spoken: Mutex<Vec<String>>,
    listens: Mutex<Vec<Value>>,
}

impl Recorded {
    fn hit(&self, line: &str) {
        self.requests.lock().unwrap().push(line.to_string());
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

type Shared = Arc<Recorded>;

struct MockServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl MockServer {
    async fn start(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("mock listener should bind");
        let addr = listener.local_addr().expect("mock listener address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock server should run");
        });
        Self {
            base_url: format!("http://{addr}"),
            handle,
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn health(State(rec): State<Shared>) -> Json<Value> {
    rec.hit("GET /health");
    Json(json!({
        "server": "running",
        "reminders_active": 1,
        "components": { "microphone": "unavailable" }
    }))
}

async fn process(State(rec): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    rec.hit("POST /process");
    let command = body["command"].as_str().unwrap_or_default().to_string();
    rec.commands.lock().unwrap().push(command.clone());
    if command == "break" {
        return Json(json!({ "success": false, "error": "unknown command" }));
    }
    Json(json!({ "success": true, "response": format!("You said: {command}") }))
}

async fn history(State(rec): State<Shared>) -> Json<Value> {
    rec.hit("GET /history");
    Json(json!({
        "success": true,
        "history": [{ "you": "hi" }, { "assistant": "Hello!" }]
    }))
}

async fn speak(State(rec): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    rec.hit("POST /speak");
    match body["text"].as_str() {
        Some(text) => {
            rec.spoken.lock().unwrap().push(text.to_string());
            Json(json!({ "success": true }))
        }
        None => Json(json!({ "success": false, "error": "Missing 'text'" })),
    }
}

async fn listen(State(rec): State<Shared>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    rec.hit("POST /listen");
    let quiet = body["timeout"] == 1;
    rec.listens.lock().unwrap().push(body);
    if quiet {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "ERROR: No speech detected. Please try again." })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({ "success": true, "command": "what time is it", "response": "It is 5 PM." })),
    )
}

async fn clear_history(State(rec): State<Shared>) -> StatusCode {
    rec.hit("DELETE /history");
    StatusCode::NO_CONTENT
}

async fn list_reminders(State(rec): State<Shared>) -> Json<Value> {
    rec.hit("GET /reminders");
    Json(json!({
        "success": true,
        "reminders": [
            { "id": 1, "time": "05:00 PM 18-Oct", "text": "drink water" },
            { "id": 7, "time": "06:30 PM 18-Oct", "text": "stretch" }
        ]
    }))
}

async fn clear_reminders(State(rec): State<Shared>) -> Json<Value> {
    rec.hit("DELETE /reminders/clear");
    Json(json!({ "success": true }))
}

async fn delete_reminder(State(rec): State<Shared>, Path(id): Path<String>) -> StatusCode {
    rec.hit(&format!("DELETE /reminders/{id}"));
    if id == "7" {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    }
}

async fn trigger_popup(State(rec): State<Shared>) -> Json<Value> {
    rec.hit("GET /trigger_popup");
    if rec.polls.fetch_add(1, Ordering::SeqCst) == 0 {
        Json(json!({ "success": true, "message": "drink water", "id": 1, "time": "05:00 PM 18-Oct" }))
    } else {
        Json(json!({ "success": false }))
    }
}

async fn start_backend() -> (MockServer, Shared, HttpBackend) {
    let rec: Shared = Arc::default();
    let app = Router::new()
        .route("/health", get(health))
        .route("/process", post(process))
        .route("/history", get(history).delete(clear_history))
        .route("/speak", post(speak))
        .route("/listen", post(listen))
        .route("/reminders", get(list_reminders))
        .route("/reminders/clear", delete(clear_reminders))
        .route("/reminders/{id}", delete(delete_reminder))
        .route("/trigger_popup", get(trigger_popup))
        .with_state(Arc::clone(&rec));
    let server = MockServer::start(app).await;
    let backend = HttpBackend::new(&server.base_url, Duration::from_secs(5)).expect("client should build");
    (server, rec, backend)
}

#[tokio::test]
async fn health_reports_microphone_from_components() {
    let (_server, rec, backend) = start_backend().await;
    let status = backend.health().await.expect("health should succeed");
    assert!(!status.microphone_available);
    assert_eq!(status.server.as_deref(), Some("running"));
    assert_eq!(status.reminders_active, Some(1));
    assert_eq!(rec.requests(), vec!["GET /health"]);
}

#[tokio::test]
async fn process_posts_raw_command() {
    let (_server, rec, backend) = start_backend().await;

    let reply = backend.process("what time is it").await.expect("process should succeed");
    assert!(reply.success);
    assert_eq!(reply.response.as_deref(), Some("You said: what time is it"));

    let reply = backend.process("break").await.expect("process should succeed");
    assert!(!reply.success);
    assert_eq!(reply.error.as_deref(), Some("unknown command"));

    assert_eq!(*rec.commands.lock().unwrap(), vec!["what time is it", "break"]);
}

#[tokio::test]
async fn reminder_endpoints_use_expected_paths() {
    let (_server, rec, backend) = start_backend().await;

    let list = backend.list_reminders().await.expect("list should succeed");
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].id, ReminderId::Number(1));
    assert_eq!(list[1].text, "stretch");

    backend
        .delete_reminder(&ReminderId::Number(1))
        .await
        .expect("delete should succeed");
    backend.clear_reminders().await.expect("clear should succeed");
    backend.clear_history().await.expect("history clear should succeed");

    assert_eq!(
        rec.requests(),
        vec![
            "GET /reminders",
            "DELETE /reminders/1",
            "DELETE /reminders/clear",
            "DELETE /history"
        ]
    );
}

#[tokio::test]
async fn reminder_id_never_escapes_its_path_segment() {
    let (_server, rec, backend) = start_backend().await;

    for reserved in ["clear", "..", "."] {
        let err = backend
            .delete_reminder(&ReminderId::Text(reserved.into()))
            .await
            .expect_err("reserved id should be refused");
        assert!(matches!(err, ApiError::InvalidId(ref id) if id == reserved), "got {err:?}");
    }
    assert!(rec.requests().is_empty(), "reserved ids reached the server");

    backend
        .delete_reminder(&ReminderId::Text("../history".into()))
        .await
        .expect("escaped id should reach the single-reminder route");
    backend
        .delete_reminder(&ReminderId::Text("x?y=1".into()))
        .await
        .expect("escaped id should reach the single-reminder route");

    assert_eq!(
        rec.requests(),
        vec!["DELETE /reminders/../history", "DELETE /reminders/x?y=1"]
    );
}

#[tokio::test]
async fn history_speak_and_listen_round_trip() {
    let (_server, rec, backend) = start_backend().await;

    let history = backend.history().await.expect("history should load");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].you.as_deref(), Some("hi"));
    assert_eq!(history[1].assistant.as_deref(), Some("Hello!"));

    backend.speak("drink water").await.expect("speak should succeed");
    assert_eq!(*rec.spoken.lock().unwrap(), vec!["drink water"]);

    let heard = backend
        .listen(ListenOptions { timeout: 5, phrase_time_limit: 10 })
        .await
        .expect("listen should succeed");
    assert!(heard.success);
    assert_eq!(heard.command.as_deref(), Some("what time is it"));
    assert_eq!(heard.response.as_deref(), Some("It is 5 PM."));

    // A 400 from /listen still carries the reason.
    let quiet = backend
        .listen(ListenOptions { timeout: 1, phrase_time_limit: 10 })
        .await
        .expect("listen failure should decode");
    assert!(!quiet.success);
    assert_eq!(quiet.error.as_deref(), Some("ERROR: No speech detected. Please try again."));

    assert_eq!(
        *rec.listens.lock().unwrap(),
        vec![
            json!({ "timeout": 5, "phrase_time_limit": 10 }),
            json!({ "timeout": 1, "phrase_time_limit": 10 })
        ]
    );
}

#[tokio::test]
async fn listen_without_reason_maps_to_status_error() {
    let app = Router::new().route(
        "/listen",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let server = MockServer::start(app).await;
    let backend = HttpBackend::new(&server.base_url, Duration::from_secs(5)).expect("client should build");

    let err = backend
        .listen(ListenOptions { timeout: 5, phrase_time_limit: 10 })
        .await
        .expect_err("listen should fail");
    assert!(matches!(err, ApiError::Status(500)), "got {err:?}");
}

#[tokio::test]
async fn non_success_status_maps_to_status_error() {
    let (_server, _rec, backend) = start_backend().await;
    let err = backend
        .delete_reminder(&ReminderId::Number(7))
        .await
        .expect_err("delete of id 7 should fail");
    assert!(matches!(err, ApiError::Status(404)), "got {err:?}");
}

#[tokio::test]
async fn trigger_popup_signals_once() {
    let (_server, _rec, backend) = start_backend().await;
    let alert = backend
        .check_due_reminder()
        .await
        .expect("poll should succeed")
        .expect("first poll carries a reminder");
    assert_eq!(alert.message, "drink water");
    assert_eq!(alert.time.as_deref(), Some("05:00 PM 18-Oct"));

    assert!(backend.check_due_reminder().await.expect("poll should succeed").is_none());
}

#[tokio::test]
async fn undecodable_body_maps_to_decode_error() {
    let app = Router::new().route("/reminders", get(|| async { "definitely not json" }));
    let server = MockServer::start(app).await;
    let backend = HttpBackend::new(&server.base_url, Duration::from_secs(5)).expect("client should build");

    let err = backend.list_reminders().await.expect_err("list should fail");
    assert!(matches!(err, ApiError::Decode(_)), "got {err:?}");
}

#[tokio::test]
async fn rejected_list_maps_to_rejected_error() {
    let app = Router::new().route(
        "/reminders",
        get(|| async { Json(json!({ "success": false, "error": "database locked" })) }),
    );
    let server = MockServer::start(app).await;
    let backend = HttpBackend::new(&server.base_url, Duration::from_secs(5)).expect("client should build");

    let err = backend.list_reminders().await.expect_err("list should fail");
    assert!(matches!(err, ApiError::Rejected(ref reason) if reason == "database locked"), "got {err:?}");
}

#[tokio::test]
async fn slow_backend_times_out_as_transport_error() {
    let app = Router::new().route(
        "/health",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({ "server": "running" }))
        }),
    );
    let server = MockServer::start(app).await;
    let backend = HttpBackend::new(&server.base_url, Duration::from_millis(200)).expect("client should build");

    let err = backend.health().await.expect_err("health should time out");
    assert!(matches!(err, ApiError::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn unreachable_backend_is_transport_error() {
    let backend = HttpBackend::new("http://127.0.0.1:9", Duration::from_secs(2)).expect("client should build");
    let err = backend.process("hello").await.expect_err("process should fail");
    assert!(matches!(err, ApiError::Transport(_)), "got {err:?}");
}
