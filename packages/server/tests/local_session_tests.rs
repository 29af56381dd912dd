//! Integration tests for local credential sessions.
//!
//! Register, login, cookie-backed resolution and logout over HTTP.

mod common;

use common::{cookie_pair, mint_token, Auth, TestApp};
use lembarkerja_core::common::Role;
use lembarkerja_core::domains::auth::{RoleLookupFailurePolicy, SESSION_COOKIE_NAME};
use lembarkerja_core::kernel::AccountSettings;
use serde_json::json;

fn auto_verified() -> AccountSettings {
    AccountSettings {
        auto_verify_email: true,
        admin_emails: vec!["owner@lembarkerja.id".to_string()],
    }
}

/// Register and log in, returning the `Cookie` header value
async fn signed_in(app: &TestApp, email: &str) -> String {
    let response = app
        .post_json(
            "/api/auth/register",
            Auth::None,
            json!({ "email": email, "password": "correct horse", "name": "Sari" }),
        )
        .await;
    assert_eq!(response.status, 201, "register failed: {}", response.body);

    let response = app
        .post_json(
            "/api/auth/login",
            Auth::None,
            json!({ "email": email, "password": "correct horse" }),
        )
        .await;
    assert_eq!(response.status, 200, "login failed: {}", response.body);

    cookie_pair(&response.set_cookie().expect("login sets a cookie"))
}

#[tokio::test]
async fn test_register_then_login_opens_cookie_session() {
    let app = TestApp::local(auto_verified());

    let cookie = signed_in(&app, "sari@lembarkerja.id").await;
    assert!(cookie.starts_with(&format!("{}=", SESSION_COOKIE_NAME)));

    let session = app.get("/api/auth/session", Auth::Cookie(&cookie)).await;
    assert_eq!(session.body["user"]["email"], "sari@lembarkerja.id");
    assert_eq!(session.body["user"]["name"], "Sari");
    assert_eq!(session.body["user"]["role"], "USER");
    assert!(session.body["expires"]
        .as_str()
        .is_some_and(|e| e.ends_with('Z')));

    let me = app.get("/api/me", Auth::Cookie(&cookie)).await;
    assert_eq!(me.status, 200);
    assert_eq!(me.body, session.body);
}

#[tokio::test]
async fn test_login_response_sets_http_only_cookie() {
    let app = TestApp::local(auto_verified());
    app.post_json(
        "/api/auth/register",
        Auth::None,
        json!({ "email": "c@lembarkerja.id", "password": "longenough" }),
    )
    .await;

    let response = app
        .post_json(
            "/api/auth/login",
            Auth::None,
            json!({ "email": "c@lembarkerja.id", "password": "longenough" }),
        )
        .await;

    let set_cookie = response.set_cookie().expect("cookie");
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Path=/"));
    // Name falls back to the email local part
    assert_eq!(response.body["user"]["name"], "c");
}

#[tokio::test]
async fn test_configured_admin_email_registers_as_super_admin() {
    let app = TestApp::local(auto_verified());

    let cookie = signed_in(&app, "Owner@LembarKerja.id").await;

    let response = app.get("/api/admin/users", Auth::Cookie(&cookie)).await;
    assert_eq!(response.status, 200);

    let session = app.get("/api/me", Auth::Cookie(&cookie)).await;
    assert_eq!(session.body["user"]["role"], "SUPER_ADMIN");
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email_look_the_same() {
    let app = TestApp::local(auto_verified());
    signed_in(&app, "sari@lembarkerja.id").await;

    let wrong_password = app
        .post_json(
            "/api/auth/login",
            Auth::None,
            json!({ "email": "sari@lembarkerja.id", "password": "incorrect" }),
        )
        .await;
    let unknown = app
        .post_json(
            "/api/auth/login",
            Auth::None,
            json!({ "email": "nobody@lembarkerja.id", "password": "incorrect" }),
        )
        .await;

    assert_eq!(wrong_password.status, 401);
    assert_eq!(wrong_password.body, unknown.body);
    assert!(wrong_password.set_cookie().is_none());
}

#[tokio::test]
async fn test_unverified_account_cannot_log_in() {
    let app = TestApp::local(AccountSettings::default());
    app.post_json(
        "/api/auth/register",
        Auth::None,
        json!({ "email": "new@lembarkerja.id", "password": "longenough" }),
    )
    .await;

    let response = app
        .post_json(
            "/api/auth/login",
            Auth::None,
            json!({ "email": "new@lembarkerja.id", "password": "longenough" }),
        )
        .await;

    assert_eq!(response.status, 403);
    assert_eq!(response.body["error"], "Forbidden");
}

#[tokio::test]
async fn test_register_validation_and_duplicates() {
    let app = TestApp::local(auto_verified());

    let short = app
        .post_json(
            "/api/auth/register",
            Auth::None,
            json!({ "email": "a@lembarkerja.id", "password": "short" }),
        )
        .await;
    assert_eq!(short.status, 400);

    let bad_email = app
        .post_json(
            "/api/auth/register",
            Auth::None,
            json!({ "email": "not-an-email", "password": "longenough" }),
        )
        .await;
    assert_eq!(bad_email.status, 400);

    signed_in(&app, "dup@lembarkerja.id").await;
    let duplicate = app
        .post_json(
            "/api/auth/register",
            Auth::None,
            json!({ "email": "DUP@lembarkerja.id", "password": "longenough" }),
        )
        .await;
    assert_eq!(duplicate.status, 409);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = TestApp::local(auto_verified());
    let cookie = signed_in(&app, "bye@lembarkerja.id").await;

    let response = app.post_json("/api/auth/logout", Auth::Cookie(&cookie), json!({})).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({ "success": true }));
    let cleared = response.set_cookie().expect("logout clears the cookie");
    assert!(cleared.contains("Max-Age=0"));

    // The browser drops the cookie, so the next request has none
    let me = app.get("/api/me", Auth::None).await;
    assert_eq!(me.status, 401);
}

#[tokio::test]
async fn test_tampered_cookie_is_unauthenticated() {
    let app = TestApp::local(auto_verified());
    let cookie = signed_in(&app, "t@lembarkerja.id").await;
    let tampered = format!("{}x", cookie);

    let session = app.get("/api/auth/session", Auth::Cookie(&tampered)).await;
    assert!(session.body.is_null());

    let me = app.get("/api/me", Auth::Cookie(&tampered)).await;
    assert_eq!(me.status, 401);
}

#[tokio::test]
async fn test_local_mode_ignores_bearer_tokens() {
    let app = TestApp::local(auto_verified());
    app.users.insert_with_role("admin@lembarkerja.id", Role::Admin).await;
    let token = mint_token(json!({
        "sub": "ext",
        "email": "admin@lembarkerja.id",
        "exp": 1999999999
    }));

    let response = app.get("/api/me", Auth::Bearer(&token)).await;

    assert_eq!(response.status, 401);
}

#[tokio::test]
async fn test_sync_is_unavailable_in_local_mode() {
    let app = TestApp::local(auto_verified());

    let response = app.post_json("/api/auth/sync", Auth::None, json!({})).await;

    assert_eq!(response.status, 404);
}

#[tokio::test]
async fn test_credential_routes_are_unavailable_in_hosted_mode() {
    let app = TestApp::hosted(RoleLookupFailurePolicy::Deny);

    let register = app
        .post_json(
            "/api/auth/register",
            Auth::None,
            json!({ "email": "a@lembarkerja.id", "password": "longenough" }),
        )
        .await;
    assert_eq!(register.status, 404);

    let login = app
        .post_json(
            "/api/auth/login",
            Auth::None,
            json!({ "email": "a@lembarkerja.id", "password": "longenough" }),
        )
        .await;
    assert_eq!(login.status, 404);

    let provider = app.get("/api/auth/provider", Auth::None).await;
    assert_eq!(provider.body["provider"], "hosted");
}

#[tokio::test]
async fn test_health_reports_store_status() {
    let app = TestApp::local(auto_verified());

    let healthy = app.get("/health", Auth::None).await;
    assert_eq!(healthy.status, 200);
    assert_eq!(healthy.body["status"], "healthy");
    assert_eq!(healthy.body["auth_provider"], "local");

    app.users.set_unavailable(true);
    let unhealthy = app.get("/health", Auth::None).await;
    assert_eq!(unhealthy.status, 503);
    assert_eq!(unhealthy.body["database"]["status"], "error");
}
