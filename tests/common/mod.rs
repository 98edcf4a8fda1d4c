//! Shared test utilities for workflow integration tests.
//!
//! Provides `TestEnv` - an isolated session directory plus an in-process
//! fake backend, with automatic cleanup via `TempDir`.
//!
//! The fake backend answers from a table of canned responses keyed by
//! method and path, and records every request it receives so tests can
//! assert on headers and bodies. It also stands in for the payment
//! provider's REST API.

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::Value;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use trackgpx::client::ApiClient;
use trackgpx::config::OpenPaySettings;
use trackgpx::models::SessionUser;
use trackgpx::services::OpenPayGateway;
use trackgpx::session::SessionStore;

pub const MERCHANT_ID: &str = "mtest123";
pub const PUBLIC_KEY: &str = "pk_test_abc";

/// One request as seen by the fake backend
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: String,
}

#[allow(dead_code)]
impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Clone)]
struct Route {
    method: Method,
    path: String,
    status: StatusCode,
    body: String,
}

#[derive(Default)]
struct BackendState {
    routes: Vec<Route>,
    requests: Vec<RecordedRequest>,
}

type Shared = Arc<Mutex<BackendState>>;

async fn handle(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut state = state.lock().unwrap();
    state.requests.push(RecordedRequest {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    // Last registered route wins so tests can override defaults
    match state
        .routes
        .iter()
        .rev()
        .find(|r| r.method == method && r.path == uri.path())
    {
        Some(route) => (
            route.status,
            [("content-type", "application/json")],
            route.body.clone(),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            [("content-type", "application/json")],
            r#"{"message":"Route not found"}"#.to_string(),
        )
            .into_response(),
    }
}

/// In-process HTTP server bound to `127.0.0.1:0`
#[derive(Clone)]
pub struct FakeBackend {
    addr: SocketAddr,
    state: Shared,
}

#[allow(dead_code)]
impl FakeBackend {
    /// Bind and serve on the current tokio runtime
    pub async fn start() -> Result<Self> {
        let state: Shared = Arc::new(Mutex::new(BackendState::default()));
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind fake backend")?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { addr, state })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Answer `method path` with `status` and a JSON body
    pub fn respond(&self, method: Method, path: &str, status: u16, body: Value) -> &Self {
        self.state.lock().unwrap().routes.push(Route {
            method,
            path: path.to_string(),
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
        });
        self
    }

    /// Answer `method path` with 200 and a JSON body
    pub fn ok(&self, method: Method, path: &str, body: Value) -> &Self {
        self.respond(method, path, 200, body)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Requests to `path`, in arrival order
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// Position of the first request to `path`, if any
    pub fn position_of(&self, path: &str) -> Option<usize> {
        self.requests().iter().position(|r| r.path == path)
    }
}

/// Isolated session directory and fake backend.
#[allow(dead_code)]
pub struct TestEnv {
    temp_dir: TempDir,
    pub session_path: PathBuf,
    pub session: SessionStore,
    pub backend: FakeBackend,
    pub client: ApiClient,
}

#[allow(dead_code)]
impl TestEnv {
    pub async fn new() -> Result<Self> {
        let temp_dir = TempDir::new().context("Failed to create temp dir")?;
        let session_path = temp_dir.path().join("session.json");
        let session = SessionStore::new(&session_path);
        let backend = FakeBackend::start().await?;
        let client = ApiClient::new(backend.url(), Duration::from_secs(5), session.clone())?;

        Ok(Self {
            temp_dir,
            session_path,
            session,
            backend,
            client,
        })
    }

    /// Same as `new`, with a token and user already stored
    pub async fn logged_in() -> Result<Self> {
        let env = Self::new().await?;
        env.session.set_token("test-token-0123456789")?;
        env.session.set_user(&sample_user())?;
        Ok(env)
    }

    /// Payment gateway pointed at the fake backend
    pub fn gateway(&self) -> OpenPayGateway {
        let settings = OpenPaySettings {
            merchant_id: MERCHANT_ID.to_string(),
            public_key: PUBLIC_KEY.to_string(),
            sandbox: true,
            api_base: Some(self.backend.url()),
        };
        OpenPayGateway::new(&settings, Duration::from_secs(5)).unwrap()
    }

    /// Gateway with no credentials
    pub fn unconfigured_gateway(&self) -> OpenPayGateway {
        let settings = OpenPaySettings {
            api_base: Some(self.backend.url()),
            ..OpenPaySettings::default()
        };
        OpenPayGateway::new(&settings, Duration::from_secs(5)).unwrap()
    }

    /// Write a file under the temp dir and return its path
    pub fn write_file(&self, name: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, content)?;
        Ok(path)
    }
}

#[allow(dead_code)]
pub fn sample_user() -> SessionUser {
    serde_json::from_value(serde_json::json!({
        "id": 7,
        "name": "Ana Torres",
        "email": "ana@acme.mx",
        "company_id": 3,
        "company": { "id": 3, "name": "Acme Logistics" }
    }))
    .unwrap()
}
