//! Shared fixtures: a router over in-memory backend and payment fakes, and request helpers.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use credlio::backend::memory::MemoryBackend;
use credlio::backend::{COUNTRIES, NOTIFICATIONS, USER_SUBSCRIPTIONS};
use credlio::billing::memory::MemoryPayments;
use credlio::billing::PriceTiers;
use credlio::config::AppConfig;
use credlio::server::{build_router, cookies::SESSION_COOKIE, AppState};

pub const BORROWER: &str = "t-borrower";
pub const LENDER: &str = "t-lender";
pub const SUBSCRIBED_LENDER: &str = "t-lender-sub";
pub const ADMIN: &str = "t-admin";
pub const COUNTRY_ADMIN: &str = "t-country-admin";
pub const SUPER_ADMIN: &str = "t-super-admin";
pub const NO_PROFILE: &str = "t-no-profile";

pub const NIGERIA_ID: &str = "6f1c1f4e-2d0a-4c55-9a0e-6a1f0c1d2b3e";

pub fn seeded_backend() -> MemoryBackend {
    MemoryBackend::new()
        .with_user(BORROWER, "u-borrower", "bola@example.com")
        .with_profile("u-borrower", "borrower")
        .with_user(LENDER, "u-lender", "lena@example.com")
        .with_profile("u-lender", "lender")
        .with_user(SUBSCRIBED_LENDER, "u-lender-sub", "sam@example.com")
        .with_profile("u-lender-sub", "lender")
        .with_row(USER_SUBSCRIPTIONS, json!({"user_id": "u-lender-sub", "status": "active", "tier": "basic"}))
        .with_row(USER_SUBSCRIPTIONS, json!({"user_id": "u-lender", "status": "canceled", "tier": "basic"}))
        .with_user(ADMIN, "u-admin", "ade@example.com")
        .with_profile("u-admin", "admin")
        .with_user(COUNTRY_ADMIN, "u-country-admin", "kofi@example.com")
        .with_profile("u-country-admin", "country_admin")
        .with_user(SUPER_ADMIN, "u-super-admin", "root@example.com")
        .with_profile("u-super-admin", "super_admin")
        .with_user(NO_PROFILE, "u-no-profile", "new@example.com")
        .with_row(COUNTRIES, json!({"id": NIGERIA_ID, "code": "NG", "name": "Nigeria"}))
        .with_row(COUNTRIES, json!({"id": "0b6a4d1e-5d54-4f0b-8f3a-1c2d3e4f5a6b", "code": "KE", "name": "Kenya"}))
        .with_row(NOTIFICATIONS, json!({"user_id": "u-borrower", "type": "loan", "read": false}))
        .with_row(NOTIFICATIONS, json!({"user_id": "u-borrower", "type": "loan", "read": false}))
        .with_row(NOTIFICATIONS, json!({"user_id": "u-borrower", "type": "loan", "read": true}))
        .with_row(NOTIFICATIONS, json!({"user_id": "u-lender", "type": "loan", "read": false}))
}

pub fn test_config() -> AppConfig {
    AppConfig {
        auth_url: Some("http://backend.invalid".into()),
        auth_anon_key: Some("anon".into()),
        price_tiers: PriceTiers { basic: Some("price_basic".into()), premium: Some("price_premium".into()) },
        ..AppConfig::default()
    }
}

pub struct TestApp {
    pub router: Router,
    pub backend: Arc<MemoryBackend>,
    pub payments: Arc<MemoryPayments>,
}

impl TestApp {
    pub fn new(backend: MemoryBackend) -> Self {
        Self::with_payments(backend, MemoryPayments::new())
    }

    pub fn with_payments(backend: MemoryBackend, payments: MemoryPayments) -> Self {
        let backend = Arc::new(backend);
        let payments = Arc::new(payments);
        let state = AppState::new(backend.clone(), payments.clone(), test_config());
        Self { router: build_router(state), backend, payments }
    }

    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
        TestResponse { status, headers, body }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(header::LOCATION).and_then(|v| v.to_str().ok())
    }

    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(String::from)
            .collect()
    }
}

fn builder(method: Method, path: &str, token: Option<&str>) -> axum::http::request::Builder {
    let b = Request::builder().method(method).uri(path);
    match token {
        Some(t) => b.header(header::COOKIE, format!("{}={}", SESSION_COOKIE, t)),
        None => b,
    }
}

pub fn get(path: &str, token: Option<&str>) -> Request<Body> {
    builder(Method::GET, path, token).body(Body::empty()).unwrap()
}

pub fn post_json(path: &str, token: Option<&str>, body: Value) -> Request<Body> {
    builder(Method::POST, path, token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
