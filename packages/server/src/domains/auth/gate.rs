//! Role gate: authentication and minimum-role checks for handlers.
//!
//! Outcomes per request:
//!
//! ```text
//! UNRESOLVED -> no/invalid credential -> UNAUTHENTICATED (401)
//!            -> valid credential      -> AUTHENTICATED(role) -> role allowed     -> AUTHORIZED
//!                                                            -> role not allowed -> FORBIDDEN (403)
//! ```
//!
//! Every guard call resolves the session again; nothing is cached on the request.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use super::session::{Session, SessionResolver};
use crate::common::{ApiError, ErrorBody, Role, ADMIN_ROLES};

pub const UNAUTHORIZED_MESSAGE: &str = "You must be logged in to access this resource";
pub const FORBIDDEN_MESSAGE: &str = "You do not have permission to access this resource";

/// Why a guard refused the request. Renders as the 401/403 JSON response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthRejection {
    #[error("{}", UNAUTHORIZED_MESSAGE)]
    Unauthorized,

    #[error("{}", FORBIDDEN_MESSAGE)]
    Forbidden,
}

impl AuthRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthRejection::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthRejection::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            AuthRejection::Unauthorized => ErrorBody::new("Unauthorized", UNAUTHORIZED_MESSAGE),
            AuthRejection::Forbidden => ErrorBody::new("Forbidden", FORBIDDEN_MESSAGE),
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

impl From<AuthRejection> for ApiError {
    fn from(rejection: AuthRejection) -> Self {
        match rejection {
            AuthRejection::Unauthorized => ApiError::Unauthorized(UNAUTHORIZED_MESSAGE.into()),
            AuthRejection::Forbidden => ApiError::Forbidden(FORBIDDEN_MESSAGE.into()),
        }
    }
}

/// Require an authenticated session
pub async fn require_authenticated(
    resolver: &SessionResolver,
    headers: &HeaderMap,
) -> Result<Session, AuthRejection> {
    resolver
        .resolve(headers)
        .await
        .ok_or(AuthRejection::Unauthorized)
}

/// Require an authenticated session whose role is one of `allowed`
pub async fn require_role(
    resolver: &SessionResolver,
    headers: &HeaderMap,
    allowed: &[Role],
) -> Result<Session, AuthRejection> {
    let session = require_authenticated(resolver, headers).await?;

    if !session.has_any_role(allowed) {
        debug!(
            user_id = %session.user.id,
            role = %session.user.role,
            "Role not permitted"
        );
        return Err(AuthRejection::Forbidden);
    }

    Ok(session)
}

fn resolver_from(parts: &Parts) -> Result<Arc<SessionResolver>, AuthRejection> {
    parts
        .extensions
        .get::<Arc<SessionResolver>>()
        .cloned()
        .ok_or_else(|| {
            error!("SessionResolver extension missing from request");
            AuthRejection::Unauthorized
        })
}

/// Extractor for handlers that need any authenticated user
#[derive(Debug, Clone)]
pub struct AuthSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let resolver = resolver_from(parts)?;
        require_authenticated(&resolver, &parts.headers)
            .await
            .map(AuthSession)
    }
}

/// Extractor for handlers restricted to `ADMIN` and `SUPER_ADMIN`
#[derive(Debug, Clone)]
pub struct AdminSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let resolver = resolver_from(parts)?;
        require_role(&resolver, &parts.headers, ADMIN_ROLES)
            .await
            .map(AdminSession)
    }
}
