//! Page routes through the access gate: redirects for missing sessions and wrong roles.

mod common;

use axum::http::StatusCode;
use common::*;

const GATED_PAGES: &[&str] = &[
    "/dashboard",
    "/borrower/dashboard",
    "/lender/dashboard",
    "/lender/subscribe",
    "/admin/dashboard",
    "/admin/countries",
];

fn assert_redirect(resp: &TestResponse, target: &str) {
    assert_eq!(resp.status, StatusCode::TEMPORARY_REDIRECT, "body: {}", resp.text());
    assert_eq!(resp.location(), Some(target));
}

#[tokio::test]
async fn every_gated_page_sends_anonymous_callers_to_sign_in() {
    let app = TestApp::new(seeded_backend());
    for page in GATED_PAGES {
        let resp = app.send(get(page, None)).await;
        assert_redirect(&resp, "/signin");
        let resp = app.send(get(page, Some("t-unknown-token"))).await;
        assert_redirect(&resp, "/signin");
    }
}

#[tokio::test]
async fn public_pages_render_without_session() {
    let app = TestApp::new(seeded_backend());
    for page in ["/", "/signin"] {
        let resp = app.send(get(page, None)).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert!(resp.text().contains("Credlio"));
    }
}

#[tokio::test]
async fn lender_on_borrower_page_goes_home() {
    let app = TestApp::new(seeded_backend());
    let resp = app.send(get("/borrower/dashboard", Some(LENDER))).await;
    assert_redirect(&resp, "/");
}

#[tokio::test]
async fn borrower_on_lender_and_admin_pages_goes_home() {
    let app = TestApp::new(seeded_backend());
    for page in ["/lender/dashboard", "/lender/subscribe", "/admin/dashboard", "/admin/countries"] {
        let resp = app.send(get(page, Some(BORROWER))).await;
        assert_redirect(&resp, "/");
    }
}

#[tokio::test]
async fn matching_role_renders_page() {
    let app = TestApp::new(seeded_backend());
    let resp = app.send(get("/borrower/dashboard", Some(BORROWER))).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.text().contains("bola@example.com"));

    let resp = app.send(get("/lender/dashboard", Some(LENDER))).await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn dashboard_redirects_to_role_home() {
    let app = TestApp::new(seeded_backend());
    let cases = [
        (BORROWER, "/borrower/dashboard"),
        (LENDER, "/lender/dashboard"),
        (ADMIN, "/admin/dashboard"),
        (COUNTRY_ADMIN, "/admin/dashboard"),
        (SUPER_ADMIN, "/admin/dashboard"),
    ];
    for (token, target) in cases {
        let resp = app.send(get("/dashboard", Some(token))).await;
        assert_redirect(&resp, target);
    }
}

#[tokio::test]
async fn subscribed_lender_skips_subscription_page() {
    let app = TestApp::new(seeded_backend());
    let resp = app.send(get("/lender/subscribe", Some(SUBSCRIBED_LENDER))).await;
    assert_redirect(&resp, "/lender/dashboard");
}

#[tokio::test]
async fn lender_without_active_subscription_sees_plans() {
    let app = TestApp::new(seeded_backend());
    let resp = app.send(get("/lender/subscribe", Some(LENDER))).await;
    assert_eq!(resp.status, StatusCode::OK);
    let html = resp.text();
    assert!(html.contains("basic"));
    assert!(html.contains("premium"));
}

#[tokio::test]
async fn admin_pages_follow_role_sets() {
    let app = TestApp::new(seeded_backend());
    for token in [ADMIN, COUNTRY_ADMIN, SUPER_ADMIN] {
        let resp = app.send(get("/admin/dashboard", Some(token))).await;
        assert_eq!(resp.status, StatusCode::OK, "token {}", token);
    }
    for token in [ADMIN, COUNTRY_ADMIN] {
        let resp = app.send(get("/admin/countries", Some(token))).await;
        assert_redirect(&resp, "/");
    }
    let resp = app.send(get("/admin/countries", Some(SUPER_ADMIN))).await;
    assert_eq!(resp.status, StatusCode::OK);
    let html = resp.text();
    assert!(html.find("KE Kenya").unwrap() < html.find("NG Nigeria").unwrap());
}

#[tokio::test]
async fn missing_profile_counts_as_no_session() {
    let app = TestApp::new(seeded_backend());
    for page in GATED_PAGES {
        let resp = app.send(get(page, Some(NO_PROFILE))).await;
        assert_redirect(&resp, "/signin");
    }
}

#[tokio::test]
async fn unreachable_backend_counts_as_no_session() {
    let app = TestApp::new(seeded_backend());
    app.backend.set_unreachable(true);
    let resp = app.send(get("/borrower/dashboard", Some(BORROWER))).await;
    assert_redirect(&resp, "/signin");
}

#[tokio::test]
async fn unrecognised_role_is_not_admitted_anywhere() {
    let backend = seeded_backend()
        .with_user("t-odd", "u-odd", "odd@example.com")
        .with_profile("u-odd", "administrator-assistant");
    let app = TestApp::new(backend);
    for page in ["/borrower/dashboard", "/lender/dashboard", "/admin/dashboard", "/admin/countries"] {
        let resp = app.send(get(page, Some("t-odd"))).await;
        assert_redirect(&resp, "/");
    }
}

#[tokio::test]
async fn same_request_twice_gets_same_answer() {
    let app = TestApp::new(seeded_backend());
    for token in [None, Some(BORROWER), Some(LENDER), Some(ADMIN), Some(NO_PROFILE)] {
        for page in GATED_PAGES {
            let a = app.send(get(page, token)).await;
            let b = app.send(get(page, token)).await;
            assert_eq!(a.status, b.status);
            assert_eq!(a.location(), b.location());
        }
    }
}

#[tokio::test]
async fn unknown_paths_are_not_found() {
    let app = TestApp::new(seeded_backend());
    let resp = app.send(get("/nowhere", None)).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    let resp = app.send(get("/api/nowhere", None)).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.json()["error"], "Not found");
}
