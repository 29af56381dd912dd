//! Application setup and server configuration.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::kernel::ServerDeps;
use crate::server::middleware::with_auth_rate_limit;
use crate::server::routes::{
    health_handler, list_users_handler, login_handler, logout_handler, me_handler,
    provider_handler, register_handler, session_handler, set_role_handler, sync_handler,
    verify_email_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AxumAppState {
    pub deps: Arc<ServerDeps>,
}

/// Router options that do not belong to the auth dependencies
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Empty means any origin (no credentials)
    pub allowed_origins: Vec<String>,
    /// Throttle register/login per client IP
    pub rate_limit_auth: bool,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            rate_limit_auth: true,
        }
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        // Session cookies only travel to explicitly listed origins
        cors.allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
    }
}

/// Build the Axum application router
pub fn build_app(deps: ServerDeps, options: AppOptions) -> Result<Router> {
    let resolver = deps.resolver.clone();
    let app_state = AxumAppState {
        deps: Arc::new(deps),
    };

    // Credential endpoints
    let mut credentials = Router::new()
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler));
    if options.rate_limit_auth {
        credentials = with_auth_rate_limit(credentials)?;
    }

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/auth/session", get(session_handler))
        .route("/api/auth/provider", get(provider_handler))
        .route("/api/auth/logout", post(logout_handler))
        .route("/api/auth/sync", post(sync_handler))
        .route("/api/me", get(me_handler))
        .route("/api/admin/users", get(list_users_handler))
        .route("/api/admin/users/:id/role", put(set_role_handler))
        .route("/api/admin/users/:id/verify-email", post(verify_email_handler))
        .merge(credentials)
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(resolver)) // Used by the AuthSession / AdminSession extractors
        .layer(Extension(app_state))
        .layer(cors_layer(&options.allowed_origins))
        .layer(TraceLayer::new_for_http());

    Ok(app)
}
