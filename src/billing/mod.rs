//! Payment provider surface: checkout-session lookup and the two subscription price tiers.

mod stripe;
pub mod memory;

pub use stripe::StripeClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BillingError {
    #[error("payment provider is not configured")]
    NotConfigured,
    #[error("payment provider unreachable: {0}")]
    Transport(String),
    #[error("payment provider returned {status}: {message}")]
    Remote { status: u16, message: String },
    #[error("unexpected payment provider payload: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for BillingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() { BillingError::Decode(err.to_string()) } else { BillingError::Transport(err.to_string()) }
    }
}

pub type BillingResult<T> = Result<T, BillingError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Basic,
    Premium,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Basic => "basic",
            SubscriptionTier::Premium => "premium",
        }
    }
}

/// Price identifiers for the two fixed tiers, supplied by configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceTiers {
    pub basic: Option<String>,
    pub premium: Option<String>,
}

impl PriceTiers {
    pub fn price_id(&self, tier: SubscriptionTier) -> Option<&str> {
        match tier {
            SubscriptionTier::Basic => self.basic.as_deref(),
            SubscriptionTier::Premium => self.premium.as_deref(),
        }
    }

    pub fn tier_for_price(&self, price_id: &str) -> Option<SubscriptionTier> {
        [SubscriptionTier::Basic, SubscriptionTier::Premium]
            .into_iter()
            .find(|t| self.price_id(*t) == Some(price_id))
    }
}

/// The subset of a checkout session the server reports back.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub price_id: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// `Ok(None)` when no session has that id.
    async fn checkout_session(&self, id: &str) -> BillingResult<Option<CheckoutSession>>;
}
