//! Shared helpers for handler tests: token minting, in-memory app state
//! and one-shot request plumbing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tower::ServiceExt;

use crate::config::{AppConfig, Environment};
use crate::db::memory::MemoryStore;
use crate::db::Backend;
use crate::mailer::{ContactMessage, MailError, Mailer};
use crate::session::{AppMetadata, Claims};
use crate::storage::LocalDiskStorage;
use crate::AppState;

pub const TEST_SECRET: &str = "test-secret-for-handler-tests";

/// Sign an access token the way the identity provider does.
pub fn mint_token(sub: &str, role: Option<&str>) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: sub.to_string(),
        email: Some(format!("{sub}@example.com")),
        exp: now + 3600,
        iat: Some(now),
        role: Some("authenticated".to_string()),
        app_metadata: AppMetadata {
            role: role.map(str::to_string),
        },
    };
    let mut claims = serde_json::to_value(claims).unwrap();
    claims["aud"] = Value::from("authenticated");
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn admin_token() -> String {
    mint_token("admin-1", Some("admin"))
}

pub fn test_config(environment: Environment) -> AppConfig {
    AppConfig {
        environment,
        jwt_secret: TEST_SECRET.to_string(),
        ..AppConfig::default()
    }
}

pub fn memory_backend(store: &Arc<MemoryStore>) -> Backend {
    Backend {
        blogs: store.clone(),
        projects: store.clone(),
        experiences: store.clone(),
        profile: store.clone(),
        public: store.clone(),
        audit: store.clone(),
    }
}

fn unique_temp_path() -> PathBuf {
    std::env::temp_dir().join(format!("portfolio-api-test-{}", uuid::Uuid::new_v4()))
}

/// Temp directory, unique per call, removed when dropped (panics included).
pub struct ScratchDir(PathBuf);

impl ScratchDir {
    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.0.join(path)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

pub fn scratch_dir() -> ScratchDir {
    ScratchDir(unique_temp_path())
}

/// Records what it was asked to send.
#[derive(Default)]
pub struct RecordingMailer {
    pub unreachable: bool,
    pub sent: std::sync::Mutex<Vec<ContactMessage>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn verify(&self) -> Result<(), MailError> {
        if self.unreachable {
            Err(MailError::Unreachable)
        } else {
            Ok(())
        }
    }

    async fn send(&self, message: &ContactMessage) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

fn build_state(
    environment: Environment,
    store: Option<&Arc<MemoryStore>>,
    mailer: Option<Arc<dyn Mailer>>,
    upload_root: PathBuf,
) -> AppState {
    AppState::new(
        test_config(environment),
        store.map(memory_backend),
        Arc::new(LocalDiskStorage::new(upload_root)),
        mailer,
    )
}

/// App state whose upload root is never created unless a test writes a
/// file. Tests that store uploads use [`state_on_disk`].
pub fn state_with(
    environment: Environment,
    store: Option<&Arc<MemoryStore>>,
    mailer: Option<Arc<dyn Mailer>>,
) -> AppState {
    build_state(environment, store, mailer, unique_temp_path())
}

/// App state storing uploads under `dir`, cleaned up with it.
pub fn state_on_disk(environment: Environment, store: Option<&Arc<MemoryStore>>, dir: &ScratchDir) -> AppState {
    build_state(environment, store, None, dir.path().to_path_buf())
}

pub fn app_with(store: &Arc<MemoryStore>) -> Router {
    crate::create_app(state_with(Environment::Development, Some(store), None))
}

pub fn offline_app() -> Router {
    crate::create_app(state_with(Environment::Development, None, None))
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "203.0.113.7")
        .header(header::USER_AGENT, "handler-tests");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Send one request and decode the JSON reply (`Null` for an empty body).
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let res = app.oneshot(request).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    if body.is_empty() {
        return (status, Value::Null);
    }
    (status, serde_json::from_slice(&body).unwrap())
}
