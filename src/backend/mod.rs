//! Client surface for the managed auth/data backend.
//! Everything durable lives behind this trait; handlers receive an injected `Arc<dyn Backend>`.

mod query;
mod records;
mod rest;
pub mod memory;

pub use query::TableQuery;
pub use records::*;
pub use rest::RestBackend;
pub(crate) use rest::base_url;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The identity returned by the auth service for a valid access token.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Credential a call is made with. Row-level security on the backend decides what each one sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller<'a> {
    /// Public anon key only.
    Anonymous,
    /// The signed-in user's access token.
    User(&'a str),
    /// Service key; bypasses row-level security.
    Service,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("backend returned {status}: {message}")]
    Remote { status: u16, code: Option<String>, message: String },
    #[error("unexpected backend payload: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn remote<S: Into<String>>(status: u16, message: S) -> Self {
        BackendError::Remote { status, code: None, message: message.into() }
    }

    /// The message a remote procedure rejected a call with, if that is what happened.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            BackendError::Remote { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

#[async_trait]
pub trait Backend: Send + Sync {
    /// Resolve an access token. `Ok(None)` when the token is unknown, expired or revoked.
    async fn current_user(&self, token: &str) -> BackendResult<Option<AuthUser>>;

    /// Revoke the session behind `token`.
    async fn sign_out(&self, token: &str) -> BackendResult<()>;

    /// Invoke a named remote procedure. Returns its `data` verbatim (`Null` for void procedures).
    async fn rpc(&self, caller: Caller<'_>, name: &str, args: Value) -> BackendResult<Value>;

    async fn select(&self, caller: Caller<'_>, query: &TableQuery) -> BackendResult<Vec<Value>>;

    /// Exact row count for the filters in `query` (select list and limit ignored).
    async fn count(&self, caller: Caller<'_>, query: &TableQuery) -> BackendResult<u64>;

    async fn insert(&self, caller: Caller<'_>, table: &str, row: Value) -> BackendResult<()>;
}
