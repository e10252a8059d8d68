use tracing::warn;

use super::principal::Principal;
use crate::backend::Backend;
use crate::tprintln;

pub type SessionToken = String;

/// A resolved, currently valid session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: SessionToken,
    pub principal: Principal,
}

/// Answers "who, if anyone, is calling" by handing the caller's token to the auth service.
pub struct SessionResolver<'a> {
    backend: &'a dyn Backend,
}

impl<'a> SessionResolver<'a> {
    pub fn new(backend: &'a dyn Backend) -> Self { Self { backend } }

    /// `None` for a missing, blank, expired or revoked token. An auth-service failure is
    /// logged and also reported as `None`.
    pub async fn resolve(&self, token: Option<&str>) -> Option<Session> {
        let token = token.map(str::trim).filter(|t| !t.is_empty())?;
        match self.backend.current_user(token).await {
            Ok(Some(user)) => {
                tprintln!("session.resolve user={}", user.id);
                Some(Session { token: token.to_string(), principal: user.into() })
            }
            Ok(None) => {
                tprintln!("session.resolve token rejected");
                None
            }
            Err(e) => {
                warn!(target: "session", "auth service error while resolving session: {}", e);
                None
            }
        }
    }
}
