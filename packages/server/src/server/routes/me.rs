use axum::Json;

use crate::domains::auth::{AuthSession, Session};

/// GET /api/me - the caller's own session; 401 when not logged in
pub async fn me_handler(AuthSession(session): AuthSession) -> Json<Session> {
    Json(session)
}
