//! In-memory payment provider for tests and local runs.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{BillingError, BillingResult, CheckoutSession, PaymentProvider};

#[derive(Debug, Default)]
pub struct MemoryPayments {
    sessions: RwLock<HashMap<String, CheckoutSession>>,
    unreachable: RwLock<bool>,
}

impl MemoryPayments {
    pub fn new() -> Self { Self::default() }

    pub fn with_session(self, session: CheckoutSession) -> Self {
        self.sessions.write().insert(session.id.clone(), session);
        self
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.write() = unreachable;
    }
}

#[async_trait]
impl PaymentProvider for MemoryPayments {
    async fn checkout_session(&self, id: &str) -> BillingResult<Option<CheckoutSession>> {
        if *self.unreachable.read() {
            return Err(BillingError::Transport("connection refused".into()));
        }
        Ok(self.sessions.read().get(id).cloned())
    }
}
