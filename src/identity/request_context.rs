use super::{Principal, Role, Session};

/// What a handler knows about the caller once the gate has allowed the request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub session: Option<Session>,
    pub role: Option<Role>,
}

impl RequestContext {
    pub fn new(session: Option<Session>, role: Option<Role>) -> Self {
        Self { request_id: uuid::Uuid::new_v4().to_string(), session, role }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.session.as_ref().map(|s| &s.principal)
    }

    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }
}

impl Default for RequestContext {
    fn default() -> Self { Self::new(None, None) }
}
