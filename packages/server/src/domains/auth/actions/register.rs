//! Register action - credentials sign-up (local session mode)

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::common::Role;
use crate::domains::auth::errors::AuthError;
use crate::domains::auth::password::hash_password;
use crate::domains::users::{normalize_email, NewUser, User};
use crate::kernel::ServerDeps;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Create a password account.
///
/// Accounts start unverified unless `auto_verify_email` is on, and get
/// SUPER_ADMIN when the email is listed in `admin_emails`.
pub async fn register_user(input: RegisterInput, deps: &ServerDeps) -> Result<User, AuthError> {
    if deps.provider().is_external_identity_mode() {
        return Err(AuthError::WrongProvider("hosted"));
    }

    let email = normalize_email(&input.email);
    validate_email(&email)?;
    if input.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::InvalidInput(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let role = if deps.accounts.is_admin_email(&email) {
        Role::SuperAdmin
    } else {
        Role::User
    };

    let new_user = NewUser {
        email: email.clone(),
        name: input
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
        password_hash: Some(hash_password(&input.password).await?),
        role,
        email_verified: deps.accounts.auto_verify_email.then(Utc::now),
    };

    let user = deps.users.create(new_user).await?;
    info!(user_id = %user.id, role = %user.role, "Registered new user");
    Ok(user)
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AuthError::InvalidInput("A valid email address is required".into())),
    }
}
