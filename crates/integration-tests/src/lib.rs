//! Integration test harness for the storefront API.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p mring-integration-tests
//! ```
//!
//! Requests go through the real router in-process via `tower::ServiceExt`,
//! so no socket or SMTP relay is needed. Mail is captured by
//! [`RecordingMailer`] and time is driven by a `ManualClock`.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use mring_core::Email;
use mring_storefront::clock::ManualClock;
use mring_storefront::config::{DeliveryPolicy, StorefrontConfig};
use mring_storefront::services::{Delivery, EmailError, Mailer, OutgoingEmail};
use mring_storefront::state::AppState;
use mring_storefront::store::MemoryStore;

/// Shop owner address used by every test context.
pub const OWNER_EMAIL: &str = "owner@mring.example";

/// Mailer that keeps every message and can be told to misbehave per address.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    refused: Mutex<HashSet<String>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingMailer {
    /// Accept nothing for `address` (relay answers, zero recipients).
    pub fn refuse(&self, address: &str) {
        self.refused.lock().unwrap().insert(address.to_string());
    }

    /// Fail outright for `address`, as a dropped connection would.
    pub fn fail(&self, address: &str) {
        self.failing.lock().unwrap().insert(address.to_string());
    }

    /// Every message handed to the transport, in order.
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Messages addressed to `address`.
    pub fn sent_to(&self, address: &str) -> Vec<OutgoingEmail> {
        self.sent()
            .into_iter()
            .filter(|m| m.to.as_str() == address)
            .collect()
    }

    /// The six-digit code from the latest mail to `address`.
    pub fn last_code_for(&self, address: &str) -> String {
        let mail = self.sent_to(address).pop().unwrap();
        mail.text
            .split_whitespace()
            .find(|w| w.len() == 6 && w.chars().all(|c| c.is_ascii_digit()))
            .unwrap()
            .to_string()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<Delivery, EmailError> {
        let to = email.to.to_string();
        self.sent.lock().unwrap().push(email);

        if self.failing.lock().unwrap().contains(&to) {
            return Err(EmailError::InvalidAddress(format!("{to} (simulated failure)")));
        }
        if self.refused.lock().unwrap().contains(&to) {
            return Ok(Delivery {
                accepted: Vec::new(),
                rejected: vec![to],
            });
        }
        Ok(Delivery {
            accepted: vec![to],
            rejected: Vec::new(),
        })
    }
}

/// Response as seen by a client.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The `error` string of a failure body.
    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }

    pub fn success(&self) -> bool {
        self.body["success"].as_bool().unwrap_or(false)
    }
}

/// A storefront router wired to fakes.
pub struct TestContext {
    pub router: Router,
    pub mailer: Arc<RecordingMailer>,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_policy(DeliveryPolicy::BestEffort)
    }

    pub fn with_policy(policy: DeliveryPolicy) -> Self {
        let mut config = Self::config();
        config.delivery_policy = policy;
        Self::with_config(config)
    }

    /// Local defaults with [`OWNER_EMAIL`] as the shop owner.
    pub fn config() -> StorefrontConfig {
        StorefrontConfig::local(Email::parse(OWNER_EMAIL).unwrap())
    }

    pub fn with_config(config: StorefrontConfig) -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(MemoryStore::new());

        let state =
            AppState::with_parts(config, mailer.clone(), store.clone(), clock.clone()).unwrap();

        Self {
            router: mring_storefront::app(state),
            mailer,
            clock,
            store,
        }
    }

    /// POST a JSON body.
    pub async fn post_json(&self, path: &str, body: &Value) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();
        self.send(request).await
    }

    /// Send a bodiless request with the given method.
    pub async fn request(&self, method: Method, path: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header(header::ORIGIN, "https://shop.example")
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Send any request through the router.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
