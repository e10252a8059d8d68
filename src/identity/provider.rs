use super::authorizer::{Role, RoleOutcome};
use super::session::Session;
use crate::backend::{profile_role, Backend};

/// Reads the role attribute of the caller's profile row.
pub struct RoleLookup<'a> {
    backend: &'a dyn Backend,
}

impl<'a> RoleLookup<'a> {
    pub fn new(backend: &'a dyn Backend) -> Self { Self { backend } }

    /// `Ok(None)` when no profile row exists yet (mid-signup) or its role is null.
    /// Store failures are returned to the caller, not retried.
    pub async fn role_for(&self, session: &Session) -> RoleOutcome {
        let raw = profile_role(self.backend, &session.token, &session.principal.user_id).await?;
        Ok(raw.map(|r| Role::parse(&r)))
    }
}
