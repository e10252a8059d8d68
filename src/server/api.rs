//! JSON API handlers. Success bodies are plain JSON objects; failures are `{ "error": ... }`
//! through `AppError` or a gate `Decision`.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::cookies::{cookie_names, expired_cookie, session_token, SESSION_COOKIE};
use super::validate;
use super::AppState;
use crate::backend::{
    admin_view_settings, country_by_code as find_country, queue_notification, record_admin_access, switch_admin_view,
    unread_notification_count, AdminAccessAttempt, NewNotification,
};
use crate::error::AppError;
use crate::identity::{Decision, RequestContext, Role};

type ApiResult = Result<Json<Value>, Response>;

fn fail(err: impl Into<AppError>) -> Response {
    err.into().into_response()
}

fn deny(d: Decision) -> Response {
    d.into_response()
}

/// Token and user id of a context the gate has already admitted.
fn caller(ctx: &RequestContext) -> Result<(&str, &str), Response> {
    match (ctx.token(), ctx.principal()) {
        (Some(token), Some(p)) => Ok((token, p.user_id.as_str())),
        _ => Err(AppError::internal("missing_session", "gate admitted a request without a session").into_response()),
    }
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "production_ready": state.config.production_ready,
        "enforce_production": state.config.enforce_production,
    }))
}

/// Always succeeds. The remote sign-out is best effort and every cookie the client sent
/// (plus the session cookie) is expired.
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        if let Err(e) = state.backend.sign_out(&token).await {
            warn!(target: "auth", "remote sign-out failed: {}", e);
        }
    }
    let mut names = cookie_names(&headers);
    if !names.iter().any(|n| n == SESSION_COOKIE) {
        names.push(SESSION_COOKIE.to_string());
    }
    let mut resp = Json(json!({ "success": true })).into_response();
    for name in names {
        if let Some(v) = expired_cookie(&name) {
            resp.headers_mut().append(SET_COOKIE, v);
        }
    }
    resp
}

pub async fn view_settings(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    let token = session_token(&headers);
    let ctx = state.gate().authorize_admin(token.as_deref()).await.map_err(deny)?;
    let (token, _) = caller(&ctx)?;
    let data = admin_view_settings(state.backend.as_ref(), token).await.map_err(fail)?;
    Ok(Json(data))
}

/// Remote rejections come back as 400 with the procedure's own message; transport failures are 500.
pub async fn switch_view(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> ApiResult {
    let token = session_token(&headers);
    let ctx = state.gate().authorize_admin(token.as_deref()).await.map_err(deny)?;
    let (token, user_id) = caller(&ctx)?;
    let req = validate::view_switch(&body).map_err(fail)?;
    match switch_admin_view(state.backend.as_ref(), token, req.mode.as_str(), req.country_id.as_deref()).await {
        Ok(data) => {
            info!(target: "admin", "[{}] user {} switched view to {}", ctx.request_id, user_id, req.mode.as_str());
            Ok(Json(data))
        }
        Err(e) => {
            if let Some(message) = e.remote_message() {
                warn!(target: "admin", "[{}] view switch rejected: {}", ctx.request_id, message);
                return Err(fail(AppError::user("view_switch_rejected", message)));
            }
            Err(fail(e))
        }
    }
}

pub async fn unread_count(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    let token = session_token(&headers);
    let ctx = state.gate().authenticate(token.as_deref()).await.map_err(deny)?;
    let (token, user_id) = caller(&ctx)?;
    let count = unread_notification_count(state.backend.as_ref(), token, user_id).await.map_err(fail)?;
    Ok(Json(json!({ "count": count })))
}

fn welcome_text(name: &str, role: &Role) -> (String, String) {
    let subject = format!("Welcome to Credlio, {}!", name);
    let message = match role {
        Role::Lender => "Your lender account is ready. Pick a subscription plan to start checking borrower \
                        reputations and tracking repayments in your country."
            .to_string(),
        _ => "Your borrower account is ready. Complete your profile so lenders in your country can review \
              your repayment history."
            .to_string(),
    };
    (subject, message)
}

/// Composes the welcome message and queues it as a notification for the signed-in user.
pub async fn welcome_email(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> ApiResult {
    let token = session_token(&headers);
    let ctx = state.gate().authenticate(token.as_deref()).await.map_err(deny)?;
    let (token, user_id) = caller(&ctx)?;
    let req = validate::welcome(&body).map_err(fail)?;
    let (subject, message) = welcome_text(&req.name, &req.role);
    let n = NewNotification {
        user_id: user_id.to_string(),
        kind: "welcome".into(),
        title: subject.clone(),
        message,
        read: false,
    };
    queue_notification(state.backend.as_ref(), token, &n).await.map_err(fail)?;
    info!(target: "email", "[{}] welcome queued for {} ({})", ctx.request_id, req.email, req.role.as_str());
    Ok(Json(json!({ "success": true, "subject": subject, "recipient": req.email })))
}

pub async fn stripe_session(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<String>) -> ApiResult {
    let token = session_token(&headers);
    state.gate().authenticate(token.as_deref()).await.map_err(deny)?;
    let id = validate::checkout_session_id(&id).map_err(fail)?;
    let session = state
        .payments
        .checkout_session(id)
        .await
        .map_err(fail)?
        .ok_or_else(|| fail(AppError::not_found("not_found", "Session not found")))?;
    let tier = session.price_id.as_deref().and_then(|p| state.config.price_tiers.tier_for_price(p));
    Ok(Json(json!({ "session": session, "tier": tier })))
}

pub async fn country_by_code(State(state): State<AppState>, Path(code): Path<String>) -> ApiResult {
    let code = validate::country_code(&code).map_err(fail)?;
    let country = find_country(state.backend.as_ref(), &code)
        .await
        .map_err(fail)?
        .ok_or_else(|| fail(AppError::not_found("not_found", "Country not found")))?;
    Ok(Json(json!({ "country": country })))
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .or_else(|| header("x-real-ip"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Records one admin sign-in attempt. A failed insert is logged and otherwise ignored.
pub async fn access_log(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> ApiResult {
    let v = validate::json_body(&body).map_err(fail)?;
    let email = v.get("email").and_then(|e| e.as_str()).map(str::trim).unwrap_or_default();
    if email.is_empty() {
        return Err(fail(AppError::user("bad_input", "email is required")));
    }
    let attempt = AdminAccessAttempt {
        email: email.to_string(),
        success: v.get("success").and_then(|s| s.as_bool()).unwrap_or(false),
        reason: v.get("reason").and_then(|r| r.as_str()).map(String::from),
        ip_address: client_ip(&headers),
        user_agent: headers.get("user-agent").and_then(|h| h.to_str().ok()).map(String::from),
        attempted_at: chrono::Utc::now().to_rfc3339(),
    };
    if let Err(e) = record_admin_access(state.backend.as_ref(), &attempt).await {
        warn!(target: "admin", "admin access log insert failed: {}", e);
    }
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn welcome_text_depends_on_role() {
        let (s, lender) = welcome_text("Ada", &Role::Lender);
        assert_eq!(s, "Welcome to Credlio, Ada!");
        let (_, borrower) = welcome_text("Ada", &Role::Borrower);
        assert!(lender.contains("subscription"));
        assert_ne!(lender, borrower);
    }

    #[test]
    fn client_ip_prefers_first_forwarded() {
        let mut h = HeaderMap::new();
        assert_eq!(client_ip(&h), None);
        h.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_ip(&h).as_deref(), Some("10.0.0.9"));
        h.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_ip(&h).as_deref(), Some("203.0.113.7"));
    }
}
