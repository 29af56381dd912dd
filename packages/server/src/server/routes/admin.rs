//! Admin endpoints. All of them go through the role gate.

use axum::{
    extract::{Extension, Path},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::common::{ApiError, Role};
use crate::domains::auth::{require_role, AdminSession};
use crate::domains::users::User;
use crate::server::app::AxumAppState;

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    /// Role name, case-insensitive
    pub role: String,
}

/// GET /api/admin/users (ADMIN, SUPER_ADMIN)
pub async fn list_users_handler(
    AdminSession(_admin): AdminSession,
    Extension(state): Extension<AxumAppState>,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.deps.users.list().await?;
    Ok(Json(users))
}

/// PUT /api/admin/users/:id/role (SUPER_ADMIN only)
pub async fn set_role_handler(
    Extension(state): Extension<AxumAppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<SetRoleRequest>,
) -> Result<Json<User>, ApiError> {
    let admin = require_role(&state.deps.resolver, &headers, &[Role::SuperAdmin]).await?;

    let role: Role = request
        .role
        .parse()
        .map_err(|e: crate::common::UnknownRole| ApiError::BadRequest(e.to_string()))?;

    let user = state
        .deps
        .users
        .set_role(id, role)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!(
        user_id = %user.id,
        role = %role,
        changed_by = %admin.user.id,
        "User role changed"
    );
    Ok(Json(user))
}

/// POST /api/admin/users/:id/verify-email (ADMIN, SUPER_ADMIN)
pub async fn verify_email_handler(
    AdminSession(admin): AdminSession,
    Extension(state): Extension<AxumAppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .deps
        .users
        .mark_email_verified(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!(user_id = %user.id, verified_by = %admin.user.id, "Email marked verified");
    Ok(Json(user))
}
