//! In-memory stand-in for the managed backend.
//!
//! Holds tokens, profiles and arbitrary table rows behind a `parking_lot::RwLock`, emulates the
//! admin procedures, and can be told to fail (whole backend or inserts into one table) so
//! route behaviour under upstream failure can be exercised without a network.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};

use super::records::{PROFILES, RPC_GET_ADMIN_VIEW, RPC_IS_ADMIN, RPC_SWITCH_ADMIN_VIEW};
use super::{AuthUser, Backend, BackendError, BackendResult, Caller, TableQuery};
use crate::identity::Role;

#[derive(Debug, Default)]
struct MemoryState {
    /// access token -> user
    tokens: HashMap<String, AuthUser>,
    tables: HashMap<String, Vec<Value>>,
    /// user id -> forced `is_admin` answer, regardless of profile role
    admin_overrides: HashMap<String, bool>,
    /// user id -> current admin view
    views: HashMap<String, Value>,
    signed_out: Vec<String>,
    unreachable: bool,
    failing_inserts: HashSet<String>,
    /// procedure name -> error returned instead of running it
    failing_rpcs: HashMap<String, BackendError>,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self { Self::default() }

    /// Register a valid access token for a user.
    pub fn with_user(self, token: &str, user_id: &str, email: &str) -> Self {
        self.state.write().tokens.insert(
            token.to_string(),
            AuthUser { id: user_id.to_string(), email: Some(email.to_string()) },
        );
        self
    }

    /// Add a `profiles` row with the given role string.
    pub fn with_profile(self, user_id: &str, role: &str) -> Self {
        self.with_row(PROFILES, json!({ "id": user_id, "role": role }))
    }

    pub fn with_row(self, table: &str, row: Value) -> Self {
        self.state.write().tables.entry(table.to_string()).or_default().push(row);
        self
    }

    /// Force the `is_admin` procedure's answer for one user.
    pub fn with_admin_override(self, user_id: &str, is_admin: bool) -> Self {
        self.state.write().admin_overrides.insert(user_id.to_string(), is_admin);
        self
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.write().unreachable = unreachable;
    }

    pub fn fail_inserts_into(&self, table: &str) {
        self.state.write().failing_inserts.insert(table.to_string());
    }

    /// Make one remote procedure fail with `err`; other procedures keep working.
    pub fn fail_rpc(&self, name: &str, err: BackendError) {
        self.state.write().failing_rpcs.insert(name.to_string(), err);
    }

    /// The procedure rejects every call with `message`, as a database exception would.
    pub fn reject_rpc(&self, name: &str, message: &str) {
        self.fail_rpc(name, BackendError::remote(400, message));
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.state.read().tables.get(table).cloned().unwrap_or_default()
    }

    pub fn signed_out_tokens(&self) -> Vec<String> {
        self.state.read().signed_out.clone()
    }

    fn check_reachable(&self) -> BackendResult<()> {
        if self.state.read().unreachable {
            return Err(BackendError::Transport("connection refused".into()));
        }
        Ok(())
    }

    fn user_for(&self, caller: Caller<'_>) -> BackendResult<AuthUser> {
        match caller {
            Caller::User(token) => self
                .state
                .read()
                .tokens
                .get(token)
                .cloned()
                .ok_or_else(|| BackendError::remote(401, "invalid JWT")),
            _ => Err(BackendError::remote(401, "procedure requires a signed-in user")),
        }
    }

    fn admin_answer(&self, user_id: &str) -> bool {
        let st = self.state.read();
        if let Some(forced) = st.admin_overrides.get(user_id) {
            return *forced;
        }
        st.tables
            .get(PROFILES)
            .into_iter()
            .flatten()
            .filter(|row| row.get("id").and_then(|v| v.as_str()) == Some(user_id))
            .filter_map(|row| row.get("role").and_then(|v| v.as_str()))
            .any(|role| Role::parse(role).is_admin_capable())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn current_user(&self, token: &str) -> BackendResult<Option<AuthUser>> {
        self.check_reachable()?;
        Ok(self.state.read().tokens.get(token).cloned())
    }

    async fn sign_out(&self, token: &str) -> BackendResult<()> {
        self.check_reachable()?;
        let mut st = self.state.write();
        st.tokens.remove(token);
        st.signed_out.push(token.to_string());
        Ok(())
    }

    async fn rpc(&self, caller: Caller<'_>, name: &str, args: Value) -> BackendResult<Value> {
        self.check_reachable()?;
        if let Some(err) = self.state.read().failing_rpcs.get(name) {
            return Err(err.clone());
        }
        let user = self.user_for(caller)?;
        match name {
            RPC_IS_ADMIN => Ok(Value::Bool(self.admin_answer(&user.id))),
            RPC_GET_ADMIN_VIEW => {
                if !self.admin_answer(&user.id) {
                    return Err(BackendError::remote(403, "Only administrators can view admin settings"));
                }
                let st = self.state.read();
                Ok(st.views.get(&user.id).cloned().unwrap_or_else(|| json!({ "mode": "global", "country_id": null })))
            }
            RPC_SWITCH_ADMIN_VIEW => {
                if !self.admin_answer(&user.id) {
                    return Err(BackendError::remote(403, "Only administrators can switch views"));
                }
                let view = json!({ "mode": args.get("p_mode").cloned().unwrap_or(Value::Null), "country_id": args.get("p_country_id").cloned().unwrap_or(Value::Null) });
                self.state.write().views.insert(user.id.clone(), view.clone());
                Ok(json!({ "success": true, "view": view }))
            }
            other => Err(BackendError::remote(404, format!("function {} does not exist", other))),
        }
    }

    async fn select(&self, _caller: Caller<'_>, query: &TableQuery) -> BackendResult<Vec<Value>> {
        self.check_reachable()?;
        let st = self.state.read();
        let rows = st.tables.get(&query.table).map(|v| v.as_slice()).unwrap_or(&[]);
        let it = rows.iter().filter(|row| query.matches(row)).map(|row| query.project(row));
        Ok(match query.limit {
            Some(n) => it.take(n).collect(),
            None => it.collect(),
        })
    }

    async fn count(&self, _caller: Caller<'_>, query: &TableQuery) -> BackendResult<u64> {
        self.check_reachable()?;
        let st = self.state.read();
        let n = st.tables.get(&query.table).map(|rows| rows.iter().filter(|row| query.matches(row)).count()).unwrap_or(0);
        Ok(n as u64)
    }

    async fn insert(&self, _caller: Caller<'_>, table: &str, row: Value) -> BackendResult<()> {
        self.check_reachable()?;
        let mut st = self.state.write();
        if st.failing_inserts.contains(table) {
            return Err(BackendError::remote(500, format!("insert into {} rejected", table)));
        }
        st.tables.entry(table.to_string()).or_default().push(row);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{is_admin, profile_role, switch_admin_view, unread_notification_count};

    #[tokio::test]
    async fn profile_role_reads_seeded_row() {
        let b = MemoryBackend::new().with_user("t1", "u1", "a@x.io").with_profile("u1", "lender");
        assert_eq!(profile_role(&b, "t1", "u1").await.unwrap(), Some("lender".to_string()));
        assert_eq!(profile_role(&b, "t1", "u2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn is_admin_follows_profile_unless_overridden() {
        let b = MemoryBackend::new()
            .with_user("t1", "u1", "a@x.io")
            .with_profile("u1", "country_admin")
            .with_user("t2", "u2", "b@x.io")
            .with_profile("u2", "super_admin")
            .with_admin_override("u2", false);
        assert!(is_admin(&b, "t1").await.unwrap());
        assert!(!is_admin(&b, "t2").await.unwrap());
    }

    #[tokio::test]
    async fn unreachable_fails_every_call() {
        let b = MemoryBackend::new().with_user("t1", "u1", "a@x.io");
        b.set_unreachable(true);
        assert!(matches!(b.current_user("t1").await, Err(BackendError::Transport(_))));
        assert!(unread_notification_count(&b, "t1", "u1").await.is_err());
    }

    #[tokio::test]
    async fn rejected_procedure_leaves_others_working() {
        let b = MemoryBackend::new().with_user("t1", "u1", "a@x.io").with_profile("u1", "admin");
        b.reject_rpc(RPC_SWITCH_ADMIN_VIEW, "Country is not active");
        assert!(is_admin(&b, "t1").await.unwrap());
        let err = switch_admin_view(&b, "t1", "global", None).await.unwrap_err();
        assert_eq!(err.remote_message(), Some("Country is not active"));
    }
}
