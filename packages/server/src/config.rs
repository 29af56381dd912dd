use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

use crate::domains::auth::{AuthProvider, RoleLookupFailurePolicy};

/// How hosted-identity tokens are verified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostedKeys {
    /// Issuer's published JWKS endpoint
    Jwks(String),
    /// HS256 shared secret (self-hosted issuers, local development)
    SharedSecret(String),
}

#[derive(Debug, Clone)]
pub struct HostedIdentityConfig {
    pub keys: HostedKeys,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LocalSessionConfig {
    pub session_secret: String,
    pub session_max_age_hours: i64,
    pub cookie_secure: bool,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub database_acquire_timeout_secs: u64,
    pub port: u16,
    pub auth_provider: AuthProvider,
    /// Set when `auth_provider` is hosted
    pub hosted: Option<HostedIdentityConfig>,
    /// Set when `auth_provider` is local
    pub local: Option<LocalSessionConfig>,
    pub role_lookup_failure: RoleLookupFailurePolicy,
    pub auto_verify_email: bool,
    pub admin_emails: Vec<String>,
    pub allowed_origins: Vec<String>,
    pub rate_limit_auth: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let auth_provider = match (var("AUTH_PROVIDER"), var("USE_HOSTED_AUTH")) {
            (Some(provider), _) => provider
                .parse::<AuthProvider>()
                .context("AUTH_PROVIDER is invalid")?,
            (None, Some(flag)) => AuthProvider::from_flag(parse_bool(&flag)),
            (None, None) => AuthProvider::default(),
        };

        let hosted = if auth_provider.is_external_identity_mode() {
            let keys = match (var("HOSTED_AUTH_JWKS_URL"), var("HOSTED_AUTH_JWT_SECRET")) {
                (Some(url), _) => HostedKeys::Jwks(url),
                (None, Some(secret)) => HostedKeys::SharedSecret(secret),
                (None, None) => anyhow::bail!(
                    "HOSTED_AUTH_JWKS_URL or HOSTED_AUTH_JWT_SECRET must be set for the hosted auth provider"
                ),
            };
            Some(HostedIdentityConfig {
                keys,
                issuer: var("HOSTED_AUTH_ISSUER"),
                audience: var("HOSTED_AUTH_AUDIENCE"),
            })
        } else {
            None
        };

        let local = if auth_provider.is_external_identity_mode() {
            None
        } else {
            Some(LocalSessionConfig {
                session_secret: var("SESSION_SECRET")
                    .context("SESSION_SECRET must be set for the local auth provider")?,
                session_max_age_hours: var("SESSION_MAX_AGE_HOURS")
                    .unwrap_or_else(|| "720".to_string())
                    .parse()
                    .context("SESSION_MAX_AGE_HOURS must be a valid number")?,
                cookie_secure: var("SESSION_COOKIE_SECURE")
                    .map(|v| parse_bool(&v))
                    .unwrap_or(false),
            })
        };

        Ok(Self {
            database_url: var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|| "10".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a valid number")?,
            database_acquire_timeout_secs: var("DATABASE_ACQUIRE_TIMEOUT_SECS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .context("DATABASE_ACQUIRE_TIMEOUT_SECS must be a valid number")?,
            port: var("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            auth_provider,
            hosted,
            local,
            role_lookup_failure: match var("ROLE_LOOKUP_FAILURE") {
                Some(policy) => policy
                    .parse()
                    .context("ROLE_LOOKUP_FAILURE is invalid")?,
                None => RoleLookupFailurePolicy::default(),
            },
            auto_verify_email: var("AUTO_VERIFY_EMAIL")
                .map(|v| parse_bool(&v))
                .unwrap_or(false),
            admin_emails: var("ADMIN_EMAILS").map(|v| split_list(&v)).unwrap_or_default(),
            allowed_origins: var("ALLOWED_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            rate_limit_auth: var("RATE_LIMIT_AUTH")
                .map(|v| parse_bool(&v))
                .unwrap_or(true),
        })
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
