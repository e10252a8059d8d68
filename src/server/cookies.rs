use axum::http::{HeaderMap, HeaderValue};

/// Cookie carrying the auth service's access token.
pub const SESSION_COOKIE: &str = "credlio_session";

fn cookie_pairs(headers: &HeaderMap) -> impl Iterator<Item = (&str, &str)> {
    headers
        .get_all("cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .filter_map(|part| part.trim().split_once('='))
}

pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    cookie_pairs(headers).find(|(k, _)| *k == name).map(|(_, v)| v.to_string())
}

/// Every cookie name the client sent, in order, without duplicates.
pub fn cookie_names(headers: &HeaderMap) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for (k, _) in cookie_pairs(headers) {
        if !k.is_empty() && !out.iter().any(|n| n == k) {
            out.push(k.to_string());
        }
    }
    out
}

pub fn session_token(headers: &HeaderMap) -> Option<String> {
    parse_cookie(headers, SESSION_COOKIE).filter(|t| !t.is_empty())
}

/// `Set-Cookie` value that expires `name` immediately. `None` if the name is not a valid header token.
pub fn expired_cookie(name: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}=; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; HttpOnly; Secure; SameSite=Lax; Path=/",
        name
    ))
    .ok()
}
