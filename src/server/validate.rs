//! Request-body and path validation for the JSON API. Every failure is a 400 `AppError`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::identity::Role;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));
static CHECKOUT_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^cs_(test|live)_[A-Za-z0-9]+$").expect("checkout id regex"));
static COUNTRY_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]{2}$").expect("country code regex"));

pub const MAX_NAME_LEN: usize = 120;

fn bad(msg: &str) -> AppError {
    AppError::user("bad_input", msg)
}

pub fn json_body(body: &[u8]) -> AppResult<Value> {
    if body.is_empty() {
        return Err(bad("Request body is required"));
    }
    serde_json::from_slice(body).map_err(|_| bad("Invalid JSON body"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Global,
    Country,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Global => "global",
            ViewMode::Country => "country",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSwitch {
    pub mode: ViewMode,
    pub country_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewSwitchBody {
    mode: Option<String>,
    country_id: Option<String>,
}

/// `{mode: "global"}` or `{mode: "country", countryId: <uuid>}`. A country id sent with
/// global mode is dropped.
pub fn view_switch(body: &[u8]) -> AppResult<ViewSwitch> {
    let raw: ViewSwitchBody = serde_json::from_value(json_body(body)?).map_err(|_| bad("Invalid view switch request"))?;
    match raw.mode.as_deref() {
        Some("global") => Ok(ViewSwitch { mode: ViewMode::Global, country_id: None }),
        Some("country") => {
            let id = raw
                .country_id
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| bad("countryId is required for country mode"))?;
            uuid::Uuid::parse_str(&id).map_err(|_| bad("countryId must be a UUID"))?;
            Ok(ViewSwitch { mode: ViewMode::Country, country_id: Some(id) })
        }
        _ => Err(bad("mode must be 'global' or 'country'")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeRequest {
    pub email: String,
    pub name: String,
    pub role: Role,
}

#[derive(Deserialize)]
struct WelcomeBody {
    email: Option<String>,
    name: Option<String>,
    role: Option<String>,
}

pub fn welcome(body: &[u8]) -> AppResult<WelcomeRequest> {
    let raw: WelcomeBody = serde_json::from_value(json_body(body)?).map_err(|_| bad("Invalid welcome request"))?;
    let email = raw.email.map(|s| s.trim().to_string()).unwrap_or_default();
    if !EMAIL_RE.is_match(&email) {
        return Err(bad("A valid email is required"));
    }
    let name = raw.name.map(|s| s.trim().to_string()).unwrap_or_default();
    if name.is_empty() {
        return Err(bad("name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(bad("name must be at most 120 characters"));
    }
    let role = match raw.role.as_deref().map(Role::parse) {
        Some(r @ (Role::Borrower | Role::Lender)) => r,
        _ => return Err(bad("role must be 'borrower' or 'lender'")),
    };
    Ok(WelcomeRequest { email, name, role })
}

pub fn checkout_session_id(id: &str) -> AppResult<&str> {
    if CHECKOUT_ID_RE.is_match(id) { Ok(id) } else { Err(bad("Invalid session id")) }
}

pub fn country_code(code: &str) -> AppResult<String> {
    if COUNTRY_CODE_RE.is_match(code) { Ok(code.to_ascii_uppercase()) } else { Err(bad("Invalid country code")) }
}
