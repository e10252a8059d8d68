//! Typed reads/writes over the backend tables and remote procedures the server touches.
//! Rows are passed through as JSON except where a field drives a decision.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{Backend, BackendError, BackendResult, Caller, TableQuery};

pub const PROFILES: &str = "profiles";
pub const NOTIFICATIONS: &str = "notifications";
pub const COUNTRIES: &str = "countries";
pub const ADMIN_ACCESS_LOGS: &str = "admin_access_logs";
pub const USER_SUBSCRIPTIONS: &str = "user_subscriptions";

pub const RPC_IS_ADMIN: &str = "is_admin";
pub const RPC_GET_ADMIN_VIEW: &str = "get_admin_view_settings";
pub const RPC_SWITCH_ADMIN_VIEW: &str = "switch_admin_view";

/// The role column of a user's profile row. `Ok(None)` when no profile row exists yet.
pub async fn profile_role(backend: &dyn Backend, token: &str, user_id: &str) -> BackendResult<Option<String>> {
    let q = TableQuery::new(PROFILES).select("role").eq("id", user_id).limit(1);
    let rows = backend.select(Caller::User(token), &q).await?;
    Ok(rows
        .first()
        .and_then(|row| row.get("role"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string()))
}

/// Server-side admin check. A `null` result counts as not admin.
pub async fn is_admin(backend: &dyn Backend, token: &str) -> BackendResult<bool> {
    let data = backend.rpc(Caller::User(token), RPC_IS_ADMIN, json!({})).await?;
    match data {
        Value::Bool(b) => Ok(b),
        Value::Null => Ok(false),
        other => Err(BackendError::Decode(format!("is_admin returned {}", other))),
    }
}

pub async fn admin_view_settings(backend: &dyn Backend, token: &str) -> BackendResult<Value> {
    backend.rpc(Caller::User(token), RPC_GET_ADMIN_VIEW, json!({})).await
}

pub async fn switch_admin_view(
    backend: &dyn Backend,
    token: &str,
    mode: &str,
    country_id: Option<&str>,
) -> BackendResult<Value> {
    let args = json!({ "p_mode": mode, "p_country_id": country_id });
    backend.rpc(Caller::User(token), RPC_SWITCH_ADMIN_VIEW, args).await
}

/// The user's active subscription row, if any.
pub async fn active_subscription(backend: &dyn Backend, token: &str, user_id: &str) -> BackendResult<Option<Value>> {
    let q = TableQuery::new(USER_SUBSCRIPTIONS)
        .eq("user_id", user_id)
        .eq("status", "active")
        .limit(1);
    Ok(backend.select(Caller::User(token), &q).await?.into_iter().next())
}

pub async fn unread_notification_count(backend: &dyn Backend, token: &str, user_id: &str) -> BackendResult<u64> {
    let q = TableQuery::new(NOTIFICATIONS).eq("user_id", user_id).eq("read", false);
    backend.count(Caller::User(token), &q).await
}

/// Country row by ISO code. Codes are stored upper-case.
pub async fn country_by_code(backend: &dyn Backend, code: &str) -> BackendResult<Option<Value>> {
    let q = TableQuery::new(COUNTRIES).eq("code", code.to_ascii_uppercase()).limit(1);
    Ok(backend.select(Caller::Anonymous, &q).await?.into_iter().next())
}

/// All country rows visible to the caller, ordered by code.
pub async fn list_countries(backend: &dyn Backend, token: &str) -> BackendResult<Vec<Value>> {
    let mut rows = backend.select(Caller::User(token), &TableQuery::new(COUNTRIES)).await?;
    rows.sort_by(|a, b| {
        let code = |v: &Value| v.get("code").and_then(|c| c.as_str()).unwrap_or_default().to_string();
        code(a).cmp(&code(b))
    });
    Ok(rows)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub read: bool,
}

pub async fn queue_notification(backend: &dyn Backend, token: &str, n: &NewNotification) -> BackendResult<()> {
    let row = serde_json::to_value(n).map_err(|e| BackendError::Decode(e.to_string()))?;
    backend.insert(Caller::User(token), NOTIFICATIONS, row).await
}

/// One admin sign-in attempt, as written to `admin_access_logs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminAccessAttempt {
    pub email: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub attempted_at: String,
}

pub async fn record_admin_access(backend: &dyn Backend, attempt: &AdminAccessAttempt) -> BackendResult<()> {
    let row = serde_json::to_value(attempt).map_err(|e| BackendError::Decode(e.to_string()))?;
    backend.insert(Caller::Service, ADMIN_ACCESS_LOGS, row).await
}
