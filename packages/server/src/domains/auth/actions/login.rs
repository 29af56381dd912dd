//! Login action - email + password, issues the session cookie

use tracing::{debug, info};

use crate::domains::auth::errors::AuthError;
use crate::domains::auth::password::{verify_dummy_password, verify_password};
use crate::domains::auth::session::{Session, SessionUser};
use crate::kernel::ServerDeps;

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginResult {
    /// Cookie value to install
    pub token: String,
    pub session: Session,
}

/// Check credentials and open a session.
///
/// Unknown email, wrong password and externally managed accounts all fail
/// the same way, and all pay for one Argon2 verification so response time
/// does not reveal which addresses are registered. The verification check
/// comes after the password check for the same reason.
pub async fn login(email: &str, password: &str, deps: &ServerDeps) -> Result<LoginResult, AuthError> {
    let cookies = deps
        .cookies
        .as_ref()
        .ok_or(AuthError::WrongProvider("hosted"))?;

    let Some(user) = deps.users.find_by_email(email).await? else {
        debug!("Login for unknown email");
        verify_dummy_password(password).await;
        return Err(AuthError::InvalidCredentials);
    };

    let Some(hash) = user.password.as_deref() else {
        debug!(user_id = %user.id, "Login attempted on account without password");
        verify_dummy_password(password).await;
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(hash, password).await {
        debug!(user_id = %user.id, "Wrong password");
        return Err(AuthError::InvalidCredentials);
    }

    if user.email_verified.is_none() {
        return Err(AuthError::EmailNotVerified);
    }

    let (token, session) = cookies.issue(SessionUser {
        id: user.id.to_string(),
        email: user.email.clone(),
        name: user.display_name(),
        role: user.role,
    })?;

    info!(user_id = %user.id, "User logged in");
    Ok(LoginResult { token, session })
}
