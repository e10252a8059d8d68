use tracing::debug;

use super::authorizer::{evaluate, evaluate_admin, Decision, Policy};
use super::provider::RoleLookup;
use super::request_context::RequestContext;
use super::session::{Session, SessionResolver};
use crate::backend::{is_admin, Backend};

/// Session Resolver + Role Lookup + policy, for one request.
///
/// Stateless: nothing is cached between calls, so the same backend snapshot always
/// produces the same decision.
pub struct AccessGate<'a> {
    backend: &'a dyn Backend,
}

impl<'a> AccessGate<'a> {
    pub fn new(backend: &'a dyn Backend) -> Self { Self { backend } }

    pub async fn session(&self, token: Option<&str>) -> Option<Session> {
        SessionResolver::new(self.backend).resolve(token).await
    }

    /// Role-gated access for pages and role-scoped API routes. `Err` carries the denial.
    pub async fn authorize(&self, token: Option<&str>, policy: &Policy) -> Result<RequestContext, Decision> {
        let session = self.session(token).await;
        let role = match &session {
            Some(s) => RoleLookup::new(self.backend).role_for(s).await,
            None => Ok(None),
        };
        if let Err(e) = &role {
            debug!(target: "gate", "role lookup failed: {}", e);
        }
        match evaluate(policy, session.as_ref().map(|s| &s.principal), &role) {
            Decision::Allow => Ok(RequestContext::new(session, role.ok().flatten())),
            denied => {
                debug!(target: "gate", "denied: {:?}", denied);
                Err(denied)
            }
        }
    }

    /// Session only, any role; used by API routes that just need a signed-in caller.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<RequestContext, Decision> {
        match self.session(token).await {
            Some(s) => Ok(RequestContext::new(Some(s), None)),
            None => Err(Decision::Status(401)),
        }
    }

    /// Admin-only API routes: the remote `is_admin` procedure decides, not the cached role.
    pub async fn authorize_admin(&self, token: Option<&str>) -> Result<RequestContext, Decision> {
        let session = self.session(token).await;
        let check = match &session {
            Some(s) => is_admin(self.backend, &s.token).await,
            None => Ok(false),
        };
        if let Err(e) = &check {
            debug!(target: "gate", "is_admin check failed: {}", e);
        }
        match evaluate_admin(session.as_ref().map(|s| &s.principal), &check) {
            Decision::Allow => Ok(RequestContext::new(session, None)),
            denied => Err(denied),
        }
    }
}
