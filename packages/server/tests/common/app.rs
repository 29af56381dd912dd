//! In-process router over the in-memory user store.
//!
//! Requests go through `tower::ServiceExt::oneshot`, so nothing binds a port
//! and each test gets its own store.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use lembarkerja_core::domains::auth::RoleLookupFailurePolicy;
use lembarkerja_core::kernel::test_dependencies::{hosted_deps, local_deps};
use lembarkerja_core::kernel::{AccountSettings, InMemoryUserStore};
use lembarkerja_core::server::{build_app, AppOptions};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Secret the hosted-mode test app verifies HS256 tokens with
pub const HOSTED_SECRET: &str = "integration_test_secret";

/// Router plus a handle on its store
pub struct TestApp {
    pub router: Router,
    pub users: Arc<InMemoryUserStore>,
}

/// Response pieces tests assert on
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// First `Set-Cookie` header, if any
    pub fn set_cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

fn options() -> AppOptions {
    AppOptions {
        allowed_origins: Vec::new(),
        // oneshot requests carry no peer address for the IP key extractor
        rate_limit_auth: false,
    }
}

impl TestApp {
    /// Hosted-identity mode
    pub fn hosted(policy: RoleLookupFailurePolicy) -> Self {
        Self::hosted_with(policy, AccountSettings::default())
    }

    pub fn hosted_with(policy: RoleLookupFailurePolicy, accounts: AccountSettings) -> Self {
        let users = Arc::new(InMemoryUserStore::new());
        let deps = hosted_deps(users.clone(), HOSTED_SECRET, policy, accounts);
        let router = build_app(deps, options()).expect("Failed to build app");
        Self { router, users }
    }

    /// Local-session mode
    pub fn local(accounts: AccountSettings) -> Self {
        let users = Arc::new(InMemoryUserStore::new());
        let deps = local_deps(users.clone(), accounts);
        let router = build_app(deps, options()).expect("Failed to build app");
        Self { router, users }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, path: &str, auth: Auth<'_>) -> TestResponse {
        self.send(auth.apply(Request::get(path)).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, path: &str, auth: Auth<'_>, body: Value) -> TestResponse {
        self.send(
            auth.apply(Request::post(path))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn put_json(&self, path: &str, auth: Auth<'_>, body: Value) -> TestResponse {
        self.send(
            auth.apply(Request::put(path))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

/// Credential attached to a test request
#[derive(Clone, Copy)]
pub enum Auth<'a> {
    None,
    Bearer(&'a str),
    /// Raw `Cookie` header value
    Cookie(&'a str),
}

impl Auth<'_> {
    fn apply(self, builder: axum::http::request::Builder) -> axum::http::request::Builder {
        match self {
            Auth::None => builder,
            Auth::Bearer(token) => builder.header(header::AUTHORIZATION, format!("Bearer {}", token)),
            Auth::Cookie(cookie) => builder.header(header::COOKIE, cookie),
        }
    }
}

/// HS256 token signed with [`HOSTED_SECRET`]
pub fn mint_token(claims: Value) -> String {
    mint_token_with(claims, HOSTED_SECRET)
}

pub fn mint_token_with(claims: Value, secret: &str) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign test token")
}

/// `name=value` part of a `Set-Cookie` header, ready for a `Cookie` header
pub fn cookie_pair(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}
