//! Server dependencies (using traits for testability)
//!
//! Built once at startup from [`Config`](crate::Config) and shared by every
//! handler. The auth backend is fixed here; nothing downstream re-reads
//! configuration.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::{Config, HostedKeys};
use crate::domains::auth::{
    AuthProvider, JwksClient, RoleLookupFailurePolicy, SessionCookies, SessionResolver,
    TokenDecoder,
};
use crate::domains::users::UserStore;

/// Settings for the credentials and identity-sync flows
#[derive(Debug, Clone, Default)]
pub struct AccountSettings {
    /// New local accounts are created already verified
    pub auto_verify_email: bool,
    /// Emails that receive SUPER_ADMIN when their account is first created
    pub admin_emails: Vec<String>,
}

impl AccountSettings {
    /// Case-insensitive match against `admin_emails`
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|admin| admin.trim().eq_ignore_ascii_case(email.trim()))
    }
}

/// Dependencies shared by handlers and actions
#[derive(Clone)]
pub struct ServerDeps {
    pub users: Arc<dyn UserStore>,
    pub resolver: Arc<SessionResolver>,
    /// Present in local-session mode
    pub cookies: Option<Arc<SessionCookies>>,
    /// Present in hosted-identity mode
    pub decoder: Option<Arc<TokenDecoder>>,
    pub accounts: AccountSettings,
}

impl ServerDeps {
    /// Dependencies for hosted-identity mode
    pub fn hosted(
        users: Arc<dyn UserStore>,
        decoder: Arc<TokenDecoder>,
        on_lookup_failure: RoleLookupFailurePolicy,
        accounts: AccountSettings,
    ) -> Self {
        let resolver = SessionResolver::hosted(decoder.clone(), users.clone(), on_lookup_failure);
        Self {
            users,
            resolver: Arc::new(resolver),
            cookies: None,
            decoder: Some(decoder),
            accounts,
        }
    }

    /// Dependencies for local-session mode
    pub fn local(
        users: Arc<dyn UserStore>,
        cookies: Arc<SessionCookies>,
        accounts: AccountSettings,
    ) -> Self {
        Self {
            users,
            resolver: Arc::new(SessionResolver::local(cookies.clone())),
            cookies: Some(cookies),
            decoder: None,
            accounts,
        }
    }

    /// Wire everything for the provider selected in `config`
    pub fn from_config(config: &Config, users: Arc<dyn UserStore>) -> Result<Self> {
        let accounts = AccountSettings {
            auto_verify_email: config.auto_verify_email,
            admin_emails: config.admin_emails.clone(),
        };

        match config.auth_provider {
            AuthProvider::HostedIdentity => {
                let hosted = config
                    .hosted
                    .as_ref()
                    .context("Hosted identity settings missing")?;
                let decoder = match &hosted.keys {
                    HostedKeys::Jwks(url) => TokenDecoder::with_jwks(JwksClient::new(url.clone())?),
                    HostedKeys::SharedSecret(secret) => TokenDecoder::with_shared_secret(secret),
                }
                .issuer(hosted.issuer.clone())
                .audience(hosted.audience.clone());

                Ok(Self::hosted(
                    users,
                    Arc::new(decoder),
                    config.role_lookup_failure,
                    accounts,
                ))
            }
            AuthProvider::LocalSession => {
                let local = config
                    .local
                    .as_ref()
                    .context("Local session settings missing")?;
                let cookies = SessionCookies::new(
                    &local.session_secret,
                    chrono::Duration::hours(local.session_max_age_hours),
                    local.cookie_secure,
                );
                Ok(Self::local(users, Arc::new(cookies), accounts))
            }
        }
    }

    pub fn provider(&self) -> AuthProvider {
        self.resolver.provider()
    }
}
