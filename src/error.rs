//! Unified application error model and HTTP mapping.
//! Every JSON route fails with `{ "error": message }` and the status from `http_status()`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::backend::BackendError;
use crate::billing::BillingError;

/// Message returned for every upstream/internal failure. Upstream detail is logged, never sent.
pub const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    Auth { code: String, message: String },
    Forbidden { code: String, message: String },
    NotFound { code: String, message: String },
    Upstream { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Forbidden { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Upstream { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Forbidden { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Upstream { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn forbidden<S: Into<String>>(code: S, msg: S) -> Self { AppError::Forbidden { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn upstream<S: Into<String>>(code: S, msg: S) -> Self { AppError::Upstream { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// The canonical 401 body used by every gated API route.
    pub fn unauthorized() -> Self { AppError::auth("unauthorized", "Unauthorized") }

    /// The canonical 403 body used by every gated API route.
    pub fn forbidden_default() -> Self { AppError::forbidden("forbidden", "Forbidden") }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::Auth { .. } => 401,
            AppError::Forbidden { .. } => 403,
            AppError::NotFound { .. } => 404,
            AppError::Upstream { .. } => 500,
            AppError::Internal { .. } => 500,
        }
    }

    /// Text placed in the `error` field of the response body.
    pub fn public_message(&self) -> &str {
        match self {
            AppError::Upstream { .. } | AppError::Internal { .. } => INTERNAL_MESSAGE,
            _ => self.message(),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        tracing::error!(target: "upstream", "backend call failed: {}", err);
        AppError::upstream("backend_error".to_string(), err.to_string())
    }
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        tracing::error!(target: "upstream", "billing call failed: {}", err);
        AppError::upstream("billing_error".to_string(), err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(serde_json::json!({ "error": self.public_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::user("bad_input", "oops").http_status(), 400);
        assert_eq!(AppError::auth("auth", "no").http_status(), 401);
        assert_eq!(AppError::forbidden("forbidden", "no").http_status(), 403);
        assert_eq!(AppError::not_found("not_found", "missing").http_status(), 404);
        assert_eq!(AppError::upstream("backend_error", "down").http_status(), 500);
        assert_eq!(AppError::internal("internal", "panic").http_status(), 500);
    }

    #[test]
    fn upstream_detail_is_not_public() {
        let e = AppError::upstream("backend_error", "connection refused to 10.0.0.3");
        assert_eq!(e.public_message(), INTERNAL_MESSAGE);
        assert_eq!(e.message(), "connection refused to 10.0.0.3");
        assert_eq!(AppError::unauthorized().public_message(), "Unauthorized");
        assert_eq!(AppError::forbidden_default().public_message(), "Forbidden");
    }

    #[test]
    fn backend_errors_map_to_500() {
        let e: AppError = BackendError::Transport("timed out".into()).into();
        assert_eq!(e.http_status(), 500);
        assert_eq!(e.code_str(), "backend_error");
    }
}
