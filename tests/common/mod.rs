// tests/common/mod.rs
// Shared harness for the end-to-end tests: spins up the backend on an
// ephemeral port, a stub LLM microservice with scripted replies, and a
// WebSocket client that records every broadcast.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use aura_backend::api::http::router::create_router;
use aura_backend::config::AppConfig;
use aura_backend::state::AppState;

pub struct TestApp {
    pub state: Arc<AppState>,
    pub address: String,
    pub client: reqwest::Client,
    _workspaces: tempfile::TempDir,
    _db_dir: tempfile::TempDir,
}

impl TestApp {
    pub fn workspaces_root(&self) -> PathBuf {
        self.state.config.workspaces_root.clone()
    }

    pub fn project_root(&self, user_id: i64, project: &str) -> PathBuf {
        self.workspaces_root().join(user_id.to_string()).join(project)
    }
}

/// Boot the backend against a scratch database and workspace tree.
pub async fn spawn_app(llm_server_url: &str) -> TestApp {
    let workspaces = tempfile::tempdir().expect("workspace tempdir");
    let db_dir = tempfile::tempdir().expect("db tempdir");
    let config = AppConfig {
        port: 0,
        llm_server_url: llm_server_url.to_string(),
        jwt_secret_key: "test-jwt-secret".to_string(),
        encryption_key: "test-encryption-key".to_string(),
        beta_access_key: "beta-key".to_string(),
        database_url: format!("sqlite:{}", db_dir.path().join("test.db").display()),
        algorithm: "HS256".to_string(),
        access_token_expire_minutes: 30,
        workspaces_root: workspaces.path().to_path_buf(),
    };

    let state = Arc::new(AppState::new(config).await.expect("app state"));
    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server");
    });

    TestApp {
        state,
        address,
        client: reqwest::Client::new(),
        _workspaces: workspaces,
        _db_dir: db_dir,
    }
}

// =========================================================================
// Stub LLM microservice
// =========================================================================

#[derive(Clone)]
struct StubState {
    replies: Arc<Mutex<VecDeque<String>>>,
    requests: Arc<Mutex<Vec<Value>>>,
}

pub struct StubLlm {
    pub url: String,
    replies: Arc<Mutex<VecDeque<String>>>,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl StubLlm {
    pub async fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().await.push_back(reply.into());
    }

    pub async fn requests(&self) -> Vec<Value> {
        self.requests.lock().await.clone()
    }

    /// Number of recorded requests whose rendered prompt contains `needle`.
    pub async fn request_count_containing(&self, needle: &str) -> usize {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|payload| payload.to_string().contains(needle))
            .count()
    }
}

/// Serves `POST /invoke` with newline-delimited JSON envelopes, one scripted
/// reply per call: a `chunk` envelope followed by the `final_response`.
pub async fn spawn_stub_llm(replies: Vec<String>) -> StubLlm {
    let state = StubState {
        replies: Arc::new(Mutex::new(VecDeque::from(replies))),
        requests: Arc::new(Mutex::new(Vec::new())),
    };

    let app = Router::new()
        .route("/invoke", post(invoke))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server");
    });

    StubLlm {
        url,
        replies: state.replies,
        requests: state.requests,
    }
}

async fn invoke(State(state): State<StubState>, Json(payload): Json<Value>) -> String {
    state.requests.lock().await.push(payload);
    let reply = state
        .replies
        .lock()
        .await
        .pop_front()
        .unwrap_or_else(|| "{}".to_string());

    let chunk = json!({"type": "chunk", "content": reply});
    let final_envelope = json!({"final_response": {"reply": reply}});
    format!("{}\n{}\n", chunk, final_envelope)
}

// =========================================================================
// Auth and configuration helpers
// =========================================================================

pub async fn register_and_login(app: &TestApp) -> (String, i64) {
    let register = app
        .client
        .post(format!("{}/auth/register", app.address))
        .json(&json!({
            "email": "dev@example.com",
            "password": "hunter2",
            "beta_key": "beta-key",
        }))
        .send()
        .await
        .expect("register");
    assert_eq!(register.status(), 201, "registration failed");
    let user: Value = register.json().await.expect("register body");
    let user_id = user["id"].as_i64().expect("user id");

    let login = app
        .client
        .post(format!("{}/auth/token", app.address))
        .json(&json!({"email": "dev@example.com", "password": "hunter2"}))
        .send()
        .await
        .expect("login");
    assert_eq!(login.status(), 200, "login failed");
    let token: Value = login.json().await.expect("token body");
    (token["access_token"].as_str().unwrap().to_string(), user_id)
}

/// Configure a provider key and bind every role to it.
pub async fn seed_llm_config(app: &TestApp, token: &str) {
    let key = app
        .client
        .post(format!("{}/keys/", app.address))
        .bearer_auth(token)
        .json(&json!({"provider_name": "openai", "api_key": "sk_test_abcdef123456"}))
        .send()
        .await
        .expect("create key");
    assert_eq!(key.status(), 201);

    let assignments = app
        .client
        .post(format!("{}/assignments/", app.address))
        .bearer_auth(token)
        .json(&json!({
            "assignments": [
                {"role_name": "planner", "model_id": "openai/gpt-4o", "temperature": 0.2},
                {"role_name": "coder", "model_id": "openai/gpt-4o", "temperature": 0.1},
                {"role_name": "chat", "model_id": "openai/gpt-4o", "temperature": 0.7}
            ]
        }))
        .send()
        .await
        .expect("assignments");
    assert_eq!(assignments.status(), 204);
}

pub async fn create_project(app: &TestApp, token: &str, name: &str) {
    let response = app
        .client
        .post(format!("{}/projects/{}", app.address, name))
        .bearer_auth(token)
        .send()
        .await
        .expect("create project");
    assert_eq!(response.status(), 201, "project creation failed");
}

// =========================================================================
// WebSocket client
// =========================================================================

pub struct WsCollector {
    pub messages: Arc<Mutex<Vec<Value>>>,
}

impl WsCollector {
    pub async fn snapshot(&self) -> Vec<Value> {
        self.messages.lock().await.clone()
    }

    pub async fn count_of_type(&self, message_type: &str) -> usize {
        self.messages
            .lock()
            .await
            .iter()
            .filter(|m| m["type"] == message_type)
            .count()
    }

    pub async fn has_type(&self, message_type: &str) -> bool {
        self.count_of_type(message_type).await > 0
    }

    /// Polls the recorded messages until the predicate matches or the
    /// timeout elapses.
    pub async fn wait_until<P>(&self, timeout: Duration, predicate: P) -> bool
    where
        P: Fn(&[Value]) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let messages = self.messages.lock().await;
                if predicate(&messages) {
                    return true;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    pub async fn wait_for_type(&self, message_type: &str, timeout: Duration) -> bool {
        self.wait_until(timeout, |messages| {
            messages.iter().any(|m| m["type"] == message_type)
        })
        .await
    }
}

/// Connects the command-deck socket and records every broadcast.
pub async fn connect_ws(app: &TestApp, token: &str, client_id: &str) -> WsCollector {
    let ws_url = format!(
        "{}/ws/command_deck?token={}&client_id={}",
        app.address.replace("http://", "ws://"),
        token,
        client_id
    );
    let (stream, _) = tokio_tungstenite::connect_async(ws_url.as_str())
        .await
        .expect("ws connect");
    let (_write, mut read) = stream.split();

    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();
    tokio::spawn(async move {
        while let Some(Ok(frame)) = read.next().await {
            if let tokio_tungstenite::tungstenite::Message::Text(text) = frame {
                if let Ok(value) = serde_json::from_str::<Value>(&text) {
                    sink.lock().await.push(value);
                }
            }
        }
    });

    let collector = WsCollector { messages };
    // Wait for the handshake so callers know the hub registered the socket.
    collector
        .wait_for_type("internal_ws_status", Duration::from_secs(5))
        .await;
    collector
}

/// Polls a synchronous condition until it returns true or the timeout
/// elapses.
pub async fn wait_for_sync<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Reads the persisted mission log for a project, if it exists.
pub fn read_mission_log(app: &TestApp, user_id: i64, project: &str) -> Option<Value> {
    let path = app.project_root(user_id, project).join("mission_log.json");
    let raw = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}
