use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::HeaderValue;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;

use super::{AuthUser, Backend, BackendError, BackendResult, Caller, TableQuery};

/// HTTP client for the managed backend's REST dialect:
/// auth under `/auth/v1`, tables under `/rest/v1/{table}`, procedures under `/rest/v1/rpc/{name}`.
#[derive(Clone)]
pub struct RestBackend {
    base: Url,
    anon_key: String,
    service_key: Option<String>,
    client: reqwest::Client,
}

/// Parse a service base URL so relative endpoint paths join *under* it. A gateway prefix such as
/// `https://gw.example.com/supabase` keeps its path segment.
pub(crate) fn base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).with_context(|| format!("invalid service URL: {}", raw))?;
    if url.cannot_be_a_base() {
        anyhow::bail!("service URL cannot carry paths: {}", raw);
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

impl RestBackend {
    pub fn new(base: &str, anon_key: &str, service_key: Option<&str>, connect_timeout: Duration) -> Result<Self> {
        let base = base_url(base).context("backend URL")?;
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .context("building backend HTTP client")?;
        Ok(Self {
            base,
            anon_key: anon_key.to_string(),
            service_key: service_key.map(|s| s.to_string()),
            client,
        })
    }

    fn bearer<'a>(&'a self, caller: Caller<'a>) -> &'a str {
        match caller {
            Caller::Anonymous => &self.anon_key,
            Caller::User(token) => token,
            // Without a service key the call runs with anon rights and RLS decides.
            Caller::Service => self.service_key.as_deref().unwrap_or(&self.anon_key),
        }
    }

    /// `path` is relative to the base (no leading slash).
    fn request(&self, method: Method, path: &str, caller: Caller<'_>) -> BackendResult<RequestBuilder> {
        let url = self.base.join(path.trim_start_matches('/')).map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(self
            .client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer(caller)))
    }
}

/// Pull a human-readable message out of an error body. The auth and REST halves of the
/// backend use different field names.
fn error_message(body: &Value) -> Option<String> {
    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|k| body.get(*k).and_then(|v| v.as_str()))
        .map(|s| s.to_string())
}

async fn remote_error(resp: reqwest::Response) -> BackendError {
    let status = resp.status().as_u16();
    let body: Value = resp.json().await.unwrap_or(Value::Null);
    BackendError::Remote {
        status,
        code: body.get("code").and_then(|v| v.as_str()).map(|s| s.to_string()),
        message: error_message(&body).unwrap_or_else(|| format!("HTTP {}", status)),
    }
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`.
fn parse_content_range_total(v: &HeaderValue) -> Option<u64> {
    let s = v.to_str().ok()?;
    let (_, total) = s.rsplit_once('/')?;
    total.trim().parse::<u64>().ok()
}

#[async_trait]
impl Backend for RestBackend {
    async fn current_user(&self, token: &str) -> BackendResult<Option<AuthUser>> {
        let resp = self.request(Method::GET, "auth/v1/user", Caller::User(token))?.send().await?;
        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            s if s.is_success() => Ok(Some(resp.json::<AuthUser>().await?)),
            _ => Err(remote_error(resp).await),
        }
    }

    async fn sign_out(&self, token: &str) -> BackendResult<()> {
        let resp = self.request(Method::POST, "auth/v1/logout", Caller::User(token))?.send().await?;
        match resp.status() {
            // already gone
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(()),
            s if s.is_success() => Ok(()),
            _ => Err(remote_error(resp).await),
        }
    }

    async fn rpc(&self, caller: Caller<'_>, name: &str, args: Value) -> BackendResult<Value> {
        let path = format!("rest/v1/rpc/{}", urlencoding::encode(name));
        let resp = self.request(Method::POST, &path, caller)?.json(&args).send().await?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        if !resp.status().is_success() {
            return Err(remote_error(resp).await);
        }
        Ok(resp.json::<Value>().await?)
    }

    async fn select(&self, caller: Caller<'_>, query: &TableQuery) -> BackendResult<Vec<Value>> {
        let path = format!("rest/v1/{}", urlencoding::encode(&query.table));
        let resp = self
            .request(Method::GET, &path, caller)?
            .query(&query.to_params(true))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(remote_error(resp).await);
        }
        match resp.json::<Value>().await? {
            Value::Array(rows) => Ok(rows),
            other => Err(BackendError::Decode(format!("expected array of rows, got {}", other))),
        }
    }

    async fn count(&self, caller: Caller<'_>, query: &TableQuery) -> BackendResult<u64> {
        let path = format!("rest/v1/{}", urlencoding::encode(&query.table));
        let resp = self
            .request(Method::HEAD, &path, caller)?
            .header("Prefer", "count=exact")
            .query(&query.to_params(false))
            .send()
            .await?;
        if !resp.status().is_success() {
            // HEAD responses carry no body, so only the status is available
            return Err(BackendError::remote(resp.status().as_u16(), "count failed"));
        }
        resp.headers()
            .get("content-range")
            .and_then(parse_content_range_total)
            .ok_or_else(|| BackendError::Decode("missing Content-Range total".into()))
    }

    async fn insert(&self, caller: Caller<'_>, table: &str, row: Value) -> BackendResult<()> {
        let path = format!("rest/v1/{}", urlencoding::encode(table));
        let resp = self
            .request(Method::POST, &path, caller)?
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(remote_error(resp).await);
        }
        Ok(())
    }
}
