//! Argon2 password hashing. The work runs on the blocking pool.

use anyhow::{anyhow, Context, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use std::sync::OnceLock;
use tracing::error;

/// Hash a password into an Argon2 PHC string
pub async fn hash_password(password: &str) -> Result<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash_blocking(&password))
        .await
        .context("Password hashing task failed")?
}

/// Check a password against a stored PHC string. Unparseable hashes never match.
pub async fn verify_password(hash: &str, password: &str) -> bool {
    let hash = hash.to_owned();
    let password = password.to_owned();
    match tokio::task::spawn_blocking(move || verify_blocking(&hash, &password)).await {
        Ok(matches) => matches,
        Err(e) => {
            error!(error = %e, "Password verification task failed");
            false
        }
    }
}

/// Spend the same Argon2 work as a real check, for accounts that do not exist
/// or have no password. Always fails.
pub async fn verify_dummy_password(password: &str) -> bool {
    match dummy_hash() {
        Some(hash) => {
            verify_password(hash, password).await;
        }
        None => error!("Dummy password hash unavailable"),
    }
    false
}

fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_blocking("lembarkerja-dummy-password").ok())
        .as_deref()
}

fn hash_blocking(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!(e.to_string()))?
        .to_string();
    Ok(phc)
}

fn verify_blocking(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
