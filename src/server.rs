//!
//! credlio HTTP server
//! -------------------
//! Axum router for the Credlio marketplace front server.
//!
//! Responsibilities:
//! - Resolve the caller's session from the session cookie via the managed backend.
//! - Gate every page and API route by role through `identity::AccessGate`.
//! - Turn gate decisions into redirects (pages) or `{ "error": ... }` statuses (API).
//! - Pass table reads/writes and remote procedures through to the backend, and checkout
//!   lookups through to the payment provider.
//!
//! All state lives in the external services; `AppState` only carries injected clients.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::{StatusCode, Uri};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;

use crate::backend::{Backend, RestBackend};
use crate::billing::{PaymentProvider, StripeClient};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::identity::{AccessGate, Decision};

pub mod api;
pub mod cookies;
pub mod pages;
pub mod validate;

/// Shared server state injected into all handlers.
///
/// Holds the backend and payment clients behind trait objects so tests can substitute
/// in-memory fakes, plus the loaded configuration.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn Backend>,
    pub payments: Arc<dyn PaymentProvider>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(backend: Arc<dyn Backend>, payments: Arc<dyn PaymentProvider>, config: AppConfig) -> Self {
        Self { backend, payments, config: Arc::new(config) }
    }

    pub fn gate(&self) -> AccessGate<'_> {
        AccessGate::new(self.backend.as_ref())
    }
}

impl IntoResponse for Decision {
    fn into_response(self) -> Response {
        match self {
            Decision::Allow => StatusCode::NO_CONTENT.into_response(),
            Decision::Redirect(target) => Redirect::temporary(&target).into_response(),
            Decision::Status(401) => AppError::unauthorized().into_response(),
            Decision::Status(403) => AppError::forbidden_default().into_response(),
            Decision::Status(code) => {
                let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let reason = status.canonical_reason().unwrap_or("Error");
                (status, Json(serde_json::json!({ "error": reason }))).into_response()
            }
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // pages
        .route("/", get(pages::home))
        .route("/signin", get(pages::sign_in))
        .route("/dashboard", get(pages::dashboard))
        .route("/borrower/dashboard", get(pages::borrower_dashboard))
        .route("/lender/dashboard", get(pages::lender_dashboard))
        .route("/lender/subscribe", get(pages::lender_subscribe))
        .route("/admin/dashboard", get(pages::admin_dashboard))
        .route("/admin/countries", get(pages::admin_countries))
        // JSON API
        .route("/api/health", get(api::health))
        .route("/api/auth/signout", post(api::sign_out))
        .route("/api/admin/view-settings", get(api::view_settings))
        .route("/api/admin/switch-view", post(api::switch_view))
        .route("/api/admin/access-log", post(api::access_log))
        .route("/api/notifications/unread-count", get(api::unread_count))
        .route("/api/email/welcome", post(api::welcome_email))
        .route("/api/stripe/session/{id}", get(api::stripe_session))
        .route("/api/countries/{code}", get(api::country_by_code))
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> Response {
    if uri.path().starts_with("/api/") {
        return AppError::not_found("not_found", "Not found").into_response();
    }
    (StatusCode::NOT_FOUND, Html(pages::render("Not found", "<p>The page you requested does not exist.</p>"))).into_response()
}

/// Build the production clients from configuration.
pub fn state_from_config(config: AppConfig) -> anyhow::Result<AppState> {
    let url = config.auth_url.as_deref().context("auth URL not configured")?;
    let anon = config.auth_anon_key.as_deref().context("auth anon key not configured")?;
    let backend = RestBackend::new(url, anon, config.auth_service_key.as_deref(), config.connect_timeout)?;
    let payments = StripeClient::new(config.stripe_secret_key.as_deref(), config.connect_timeout)?;
    Ok(AppState::new(Arc::new(backend), Arc::new(payments), config))
}

/// Validate configuration, build clients and serve until the listener fails.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    config.validate().context("invalid configuration")?;
    info!(
        target: "startup",
        "credlio starting: http_port={}, backend={:?}, payments_configured={}, production_ready={}, enforce_production={}",
        config.http_port,
        config.auth_url,
        config.stripe_secret_key.is_some(),
        config.production_ready,
        config.enforce_production
    );
    let port = config.http_port;
    let app = build_router(state_from_config(config)?);

    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
