//! In-process fake backend for integration tests.
//!
//! Serves the health, session and message endpoints from shared state that
//! tests can script and inspect.

#![allow(dead_code, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};

use ocrelay_core::config::BackendConfig;

/// Scriptable backend state.
pub struct FakeState {
    pub healthy: AtomicBool,
    /// Status code for `/health`; 200 unless a test overrides it.
    pub health_status: AtomicU16,
    /// Raw 200 body for `/health` in place of the JSON reply.
    pub health_body: Mutex<Option<String>>,
    /// `(id, title)` pairs, in list order.
    pub sessions: Mutex<Vec<(String, Option<String>)>>,
    /// Parts returned by every message reply.
    pub reply_parts: Mutex<Value>,
    /// Delay before answering `GET /session`.
    pub list_delay: Mutex<Duration>,
    pub list_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub create_bodies: Mutex<Vec<Value>>,
    /// `(session id, request body)` for every message received.
    pub messages: Mutex<Vec<(String, Value)>>,
    /// `Authorization` header of every request, in arrival order.
    pub auth_headers: Mutex<Vec<Option<String>>>,
    next_id: AtomicUsize,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            health_status: AtomicU16::new(200),
            health_body: Mutex::new(None),
            sessions: Mutex::new(Vec::new()),
            reply_parts: Mutex::new(json!([{"type": "text", "text": "ok"}])),
            list_delay: Mutex::new(Duration::ZERO),
            list_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            create_bodies: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
            auth_headers: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
        }
    }
}

impl FakeState {
    pub fn add_session(&self, id: &str, title: Option<&str>) {
        self.sessions
            .lock()
            .unwrap()
            .push((id.to_string(), title.map(str::to_string)));
    }

    pub fn set_reply(&self, parts: Value) {
        *self.reply_parts.lock().unwrap() = parts;
    }

    pub fn set_health_body(&self, body: &str) {
        *self.health_body.lock().unwrap() = Some(body.to_string());
    }

    pub fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = delay;
    }

    fn record_auth(&self, headers: &HeaderMap) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.auth_headers.lock().unwrap().push(auth);
    }
}

/// A running fake backend.
pub struct FakeBackend {
    pub addr: SocketAddr,
    pub state: Arc<FakeState>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        Self::start_with(FakeState::default()).await
    }

    pub async fn start_with(state: FakeState) -> Self {
        let state = Arc::new(state);
        let app = Router::new()
            .route("/health", get(health))
            .route("/session", get(list_sessions).post(create_session))
            .route("/session/{id}/message", post(send_message))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Backend config pointing at this fake, with short timeouts.
    pub fn config(&self) -> BackendConfig {
        backend_config(&self.base_url())
    }
}

/// Backend config for `base_url` with timeouts suited to tests.
pub fn backend_config(base_url: &str) -> BackendConfig {
    BackendConfig {
        base_url: base_url.to_string(),
        health_timeout_secs: 2,
        request_timeout_secs: 5,
        message_timeout_secs: 5,
        ..BackendConfig::default()
    }
}

/// A port nothing listens on.
pub async fn free_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

async fn health(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    state.record_auth(&headers);
    let status = StatusCode::from_u16(state.health_status.load(Ordering::SeqCst)).unwrap();
    if !status.is_success() {
        return (status, "unavailable").into_response();
    }
    if let Some(body) = state.health_body.lock().unwrap().clone() {
        return body.into_response();
    }
    let healthy = state.healthy.load(Ordering::SeqCst);
    Json(json!({"healthy": healthy, "version": "0.0.0-test"})).into_response()
}

async fn list_sessions(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Json<Value> {
    state.record_auth(&headers);
    state.list_calls.fetch_add(1, Ordering::SeqCst);
    let delay = *state.list_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let sessions: Vec<Value> = state
        .sessions
        .lock()
        .unwrap()
        .iter()
        .map(|(id, title)| match title {
            Some(title) => json!({"id": id, "title": title}),
            None => json!({"id": id}),
        })
        .collect();
    Json(Value::Array(sessions))
}

async fn create_session(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.record_auth(&headers);
    state.create_calls.fetch_add(1, Ordering::SeqCst);
    let n = state.next_id.fetch_add(1, Ordering::SeqCst);
    let id = format!("ses_new{n}");
    let title = body
        .get("title")
        .and_then(Value::as_str)
        .map_or_else(|| format!("New session {n}"), str::to_string);
    state.create_bodies.lock().unwrap().push(body);
    state.add_session(&id, Some(&title));
    Json(json!({"id": id, "title": title}))
}

async fn send_message(
    State(state): State<Arc<FakeState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record_auth(&headers);
    let known = state.sessions.lock().unwrap().iter().any(|(s, _)| *s == id);
    if !known {
        return (StatusCode::NOT_FOUND, format!("session not found: {id}")).into_response();
    }
    state.messages.lock().unwrap().push((id.clone(), body));
    let parts = state.reply_parts.lock().unwrap().clone();
    Json(json!({"info": {"id": "msg_1", "sessionID": id}, "parts": parts})).into_response()
}
