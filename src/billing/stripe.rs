use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::backend::base_url;
use super::{BillingError, BillingResult, CheckoutSession, PaymentProvider};

const STRIPE_API: &str = "https://api.stripe.com";

pub struct StripeClient {
    base: Url,
    secret_key: Option<String>,
    client: reqwest::Client,
}

impl StripeClient {
    pub fn new(secret_key: Option<&str>, connect_timeout: Duration) -> Result<Self> {
        Self::with_base(STRIPE_API, secret_key, connect_timeout)
    }

    pub fn with_base(base: &str, secret_key: Option<&str>, connect_timeout: Duration) -> Result<Self> {
        let base = base_url(base).context("payment provider URL")?;
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .context("building payment provider HTTP client")?;
        Ok(Self { base, secret_key: secret_key.map(|s| s.to_string()), client })
    }
}

fn str_at<'a>(v: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut cur = v;
    for key in path {
        cur = cur.get(*key)?;
    }
    cur.as_str()
}

/// Flatten the provider's session object into `CheckoutSession`.
/// Email may sit on `customer_details` or at the top level; the price comes from the first line item.
fn session_from_json(v: &Value) -> BillingResult<CheckoutSession> {
    let id = str_at(v, &["id"]).ok_or_else(|| BillingError::Decode("checkout session without id".into()))?;
    let metadata: BTreeMap<String, String> = v
        .get("metadata")
        .and_then(|m| m.as_object())
        .map(|m| m.iter().filter_map(|(k, val)| val.as_str().map(|s| (k.clone(), s.to_string()))).collect())
        .unwrap_or_default();
    let price_id = v
        .get("line_items")
        .and_then(|li| li.get("data"))
        .and_then(|d| d.get(0))
        .and_then(|item| str_at(item, &["price", "id"]))
        .or_else(|| metadata.get("price_id").map(|s| s.as_str()))
        .map(|s| s.to_string());
    Ok(CheckoutSession {
        id: id.to_string(),
        status: str_at(v, &["status"]).map(String::from),
        payment_status: str_at(v, &["payment_status"]).map(String::from),
        customer_email: str_at(v, &["customer_details", "email"])
            .or_else(|| str_at(v, &["customer_email"]))
            .map(String::from),
        amount_total: v.get("amount_total").and_then(|a| a.as_i64()),
        currency: str_at(v, &["currency"]).map(String::from),
        subscription: str_at(v, &["subscription"]).map(String::from),
        price_id,
        metadata,
    })
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn checkout_session(&self, id: &str) -> BillingResult<Option<CheckoutSession>> {
        let Some(key) = self.secret_key.as_deref() else { return Err(BillingError::NotConfigured); };
        let path = format!("v1/checkout/sessions/{}", urlencoding::encode(id));
        let url = self.base.join(&path).map_err(|e| BillingError::Transport(e.to_string()))?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(key)
            .query(&[("expand[]", "line_items")])
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body: Value = resp.json().await.unwrap_or(Value::Null);
            let message = str_at(&body, &["error", "message"]).unwrap_or("request failed").to_string();
            return Err(BillingError::Remote { status, message });
        }
        let body: Value = resp.json().await?;
        session_from_json(&body).map(Some)
    }
}
