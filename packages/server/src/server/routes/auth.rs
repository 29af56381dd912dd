//! Auth endpoints.
//!
//! - GET  /api/auth/session   resolved session, or `null`
//! - GET  /api/auth/provider  which backend this process runs
//! - POST /api/auth/register  credentials sign-up (local mode)
//! - POST /api/auth/login     credentials login, sets the session cookie (local mode)
//! - POST /api/auth/logout    clears the session cookie
//! - POST /api/auth/sync      records the bearer token's user in `users` (hosted mode)

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::ApiError;
use crate::domains::auth::actions::{login, register_user, sync_external_user, RegisterInput};
use crate::domains::auth::session::bearer_token;
use crate::domains::auth::{AuthError, AuthRejection, Session};
use crate::domains::users::User;
use crate::server::app::AxumAppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub provider: String,
}

pub async fn session_handler(
    Extension(state): Extension<AxumAppState>,
    headers: HeaderMap,
) -> Json<Option<Session>> {
    Json(state.deps.resolver.resolve(&headers).await)
}

pub async fn provider_handler(Extension(state): Extension<AxumAppState>) -> Json<ProviderResponse> {
    Json(ProviderResponse {
        provider: state.deps.provider().as_str().to_string(),
    })
}

pub async fn register_handler(
    Extension(state): Extension<AxumAppState>,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = register_user(input, &state.deps).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login_handler(
    Extension(state): Extension<AxumAppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let result = login(&request.email, &request.password, &state.deps).await?;

    let cookies = state
        .deps
        .cookies
        .as_ref()
        .ok_or(AuthError::WrongProvider("hosted"))?;

    Ok((
        [(SET_COOKIE, cookies.set_cookie(&result.token))],
        Json(result.session),
    )
        .into_response())
}

pub async fn logout_handler(Extension(state): Extension<AxumAppState>) -> Response {
    let body = Json(serde_json::json!({ "success": true }));
    match &state.deps.cookies {
        Some(cookies) => ([(SET_COOKIE, cookies.clear_cookie())], body).into_response(),
        // Hosted sessions end at the identity provider
        None => body.into_response(),
    }
}

pub async fn sync_handler(
    Extension(state): Extension<AxumAppState>,
    headers: HeaderMap,
) -> Result<Json<User>, ApiError> {
    let decoder = state
        .deps
        .decoder
        .as_ref()
        .ok_or(AuthError::WrongProvider("local"))?;

    let token = bearer_token(&headers).ok_or(AuthRejection::Unauthorized)?;
    let claims = decoder.decode(token).await.map_err(|e| {
        debug!(error = %e, "Sync token rejected");
        AuthRejection::Unauthorized
    })?;

    let user = sync_external_user(&claims, &state.deps).await?;
    Ok(Json(user))
}
