//! Shared helpers for the HTTP integration tests.
//!
//! Routers are built on the in-memory store with stubbed outbound services,
//! and requests are driven through `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use agency_api::build_router;
use agency_api::config::AppConfig;
use agency_api::outbound::{
    BotVerifier, CareersBoard, Email, Mailer, Outbound, OutboundError, SubmissionLog,
};
use agency_api::state::{AppState, Backend};
use agency_core::access::Role;
use agency_core::auth::{hash_password, issue_token, TokenConfig};
use agency_core::session::Profile;
use agency_core::store::MemoryStore;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret";

// ---------------------------------------------------------------------------
// Outbound stubs
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct StubMailer {
    pub sent: Mutex<Vec<Email>>,
    pub fail: bool,
}

#[async_trait]
impl Mailer for StubMailer {
    async fn send(&self, email: &Email) -> Result<(), OutboundError> {
        if self.fail {
            return Err(OutboundError::HttpStatus {
                service: "email API",
                status: 503,
            });
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

pub struct StubVerifier {
    pub accept: bool,
}

#[async_trait]
impl BotVerifier for StubVerifier {
    async fn verify(&self, _token: &str, _remote_ip: Option<&str>) -> Result<bool, OutboundError> {
        Ok(self.accept)
    }
}

#[derive(Default)]
pub struct StubLog {
    pub records: Mutex<Vec<Value>>,
}

#[async_trait]
impl SubmissionLog for StubLog {
    async fn append(&self, record: &Value) -> Result<(), OutboundError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

pub struct StubCareers {
    pub listings: Option<Value>,
}

#[async_trait]
impl CareersBoard for StubCareers {
    async fn listings(&self) -> Result<Value, OutboundError> {
        self.listings
            .clone()
            .ok_or(OutboundError::NotConfigured("careers API"))
    }
}

// ---------------------------------------------------------------------------
// Test application
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<StubMailer>,
    pub log: Arc<StubLog>,
}

pub struct Stubs {
    pub mail_fails: bool,
    pub verifier_accepts: bool,
    pub careers: Option<Value>,
    pub static_dir: Option<PathBuf>,
}

impl Default for Stubs {
    fn default() -> Self {
        Self {
            mail_fails: false,
            verifier_accepts: true,
            careers: None,
            static_dir: None,
        }
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        jwt_secret: TEST_SECRET.to_string(),
        ..AppConfig::default()
    }
}

pub fn build_test_app(stubs: Stubs) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(StubMailer {
        fail: stubs.mail_fails,
        ..StubMailer::default()
    });
    let log = Arc::new(StubLog::default());
    let outbound = Outbound {
        mailer: mailer.clone(),
        verifier: Arc::new(StubVerifier {
            accept: stubs.verifier_accepts,
        }),
        submissions: log.clone(),
        careers: Arc::new(StubCareers {
            listings: stubs.careers,
        }),
    };

    let mut config = test_config();
    if let Some(dir) = stubs.static_dir {
        config.static_dir = dir;
    }
    let state = AppState::new(config, Backend::Memory(store.clone()), outbound);
    TestApp {
        router: build_router(state),
        store,
        mailer,
        log,
    }
}

pub fn default_app() -> TestApp {
    build_test_app(Stubs::default())
}

/// Seed a profile with `role` and return it with a valid session token.
pub fn sign_in_as(store: &MemoryStore, role: Option<Role>) -> (Profile, String) {
    let profile = Profile {
        id: Uuid::new_v4(),
        email: format!("{}@studio.test", Uuid::new_v4().simple()),
        full_name: Some("Test User".to_string()),
        avatar_url: None,
        role,
    };
    store.seed_profile(profile.clone(), None);
    let token = issue_token(
        &TokenConfig {
            secret: TEST_SECRET.to_string(),
            ttl_mins: 60,
        },
        profile.id,
        &profile.email,
    )
    .unwrap();
    (profile, token)
}

/// Seed a profile that can sign in with `password`.
pub fn seed_account(store: &MemoryStore, email: &str, password: &str, role: Role) -> Profile {
    let profile = Profile {
        id: Uuid::new_v4(),
        email: email.to_string(),
        full_name: None,
        avatar_url: None,
        role: Some(role),
    };
    store.seed_profile(profile.clone(), Some(hash_password(password).unwrap()));
    profile
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &TestApp, uri: &str, token: Option<&str>) -> Response<Body> {
    send(app, Method::GET, uri, token, None).await
}

pub async fn post_json(app: &TestApp, uri: &str, token: Option<&str>, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, token, Some(body)).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub async fn status_and_json(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    (status, body_json(response).await)
}
