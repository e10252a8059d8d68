//! Server-rendered pages. Every gated page runs through `AccessGate::authorize` with a page
//! policy, so denials come back as redirects rather than statuses.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde_json::Value;
use tracing::error;

use super::cookies::session_token;
use super::AppState;
use crate::backend::{active_subscription, list_countries};
use crate::billing::SubscriptionTier;
use crate::identity::{Policy, RequestContext, HOME_PATH};

type PageResult = Result<Html<String>, Response>;

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap `body` (already escaped) in the site layout.
pub fn render(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\"><head><meta charset=\"utf-8\"><title>{} | Credlio</title></head>\n<body><main>\n<h1>{}</h1>\n{}\n</main></body></html>\n",
        escape(title),
        escape(title),
        body
    )
}

fn error_page() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Html(render("Something went wrong", "<p>Internal server error</p>"))).into_response()
}

async fn gate(state: &AppState, headers: &HeaderMap, policy: &Policy) -> Result<RequestContext, Response> {
    let token = session_token(headers);
    state.gate().authorize(token.as_deref(), policy).await.map_err(IntoResponse::into_response)
}

fn who(ctx: &RequestContext) -> String {
    ctx.principal()
        .and_then(|p| p.email.as_deref())
        .map(escape)
        .unwrap_or_else(|| "there".to_string())
}

pub async fn home() -> Html<String> {
    Html(render(
        "Credlio",
        "<p>Borrower reputation and lending, country by country.</p>\n<p><a href=\"/signin\">Sign in</a></p>",
    ))
}

pub async fn sign_in() -> Html<String> {
    Html(render("Sign in", "<p>Sign in with your Credlio account to continue.</p>"))
}

/// Sends any known role to its own dashboard.
pub async fn dashboard(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match gate(&state, &headers, &Policy::ANY_ROLE_PAGE).await {
        Ok(ctx) => {
            let target = ctx.role.as_ref().and_then(|r| r.dashboard_path()).unwrap_or(HOME_PATH);
            Redirect::temporary(target).into_response()
        }
        Err(denied) => denied,
    }
}

pub async fn borrower_dashboard(State(state): State<AppState>, headers: HeaderMap) -> PageResult {
    let ctx = gate(&state, &headers, &Policy::BORROWER_PAGE).await?;
    Ok(Html(render("Borrower dashboard", &format!("<p>Welcome back, {}.</p>", who(&ctx)))))
}

pub async fn lender_dashboard(State(state): State<AppState>, headers: HeaderMap) -> PageResult {
    let ctx = gate(&state, &headers, &Policy::LENDER_PAGE).await?;
    Ok(Html(render("Lender dashboard", &format!("<p>Welcome back, {}.</p>", who(&ctx)))))
}

/// Lenders with an active subscription go straight to their dashboard.
pub async fn lender_subscribe(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = match gate(&state, &headers, &Policy::LENDER_PAGE).await {
        Ok(ctx) => ctx,
        Err(denied) => return denied,
    };
    let (Some(token), Some(p)) = (ctx.token(), ctx.principal()) else { return error_page(); };
    match active_subscription(state.backend.as_ref(), token, &p.user_id).await {
        Ok(Some(_)) => Redirect::temporary("/lender/dashboard").into_response(),
        Ok(None) => {
            let tiers = &state.config.price_tiers;
            let items: String = [SubscriptionTier::Basic, SubscriptionTier::Premium]
                .into_iter()
                .filter(|t| tiers.price_id(*t).is_some())
                .map(|t| format!("<li>{}</li>", t.as_str()))
                .collect();
            Html(render("Choose a plan", &format!("<ul>{}</ul>", items))).into_response()
        }
        Err(e) => {
            error!(target: "upstream", "subscription lookup failed: {}", e);
            error_page()
        }
    }
}

pub async fn admin_dashboard(State(state): State<AppState>, headers: HeaderMap) -> PageResult {
    let ctx = gate(&state, &headers, &Policy::ADMIN_PAGE).await?;
    let role = ctx.role.as_ref().map(|r| escape(r.as_str())).unwrap_or_default();
    Ok(Html(render("Admin dashboard", &format!("<p>Signed in as {} ({}).</p>", who(&ctx), role))))
}

fn country_item(row: &Value) -> String {
    let field = |k: &str| row.get(k).and_then(|v| v.as_str()).map(escape).unwrap_or_default();
    format!("<li>{} {}</li>", field("code"), field("name"))
}

pub async fn admin_countries(State(state): State<AppState>, headers: HeaderMap) -> PageResult {
    let ctx = gate(&state, &headers, &Policy::SUPER_ADMIN_PAGE).await?;
    let Some(token) = ctx.token() else { return Err(error_page()); };
    let rows = list_countries(state.backend.as_ref(), token).await.map_err(|e| {
        error!(target: "upstream", "country listing failed: {}", e);
        error_page()
    })?;
    let items: String = rows.iter().map(country_item).collect();
    Ok(Html(render("Countries", &format!("<ul>{}</ul>", items))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
        assert!(render("A & B", "<p>x</p>").contains("<h1>A &amp; B</h1>"));
    }

    #[test]
    fn country_rows_render_escaped() {
        assert_eq!(country_item(&json!({"code": "NG", "name": "Nigeria"})), "<li>NG Nigeria</li>");
        assert_eq!(country_item(&json!({"code": "X<"})), "<li>X&lt; </li>");
    }
}
