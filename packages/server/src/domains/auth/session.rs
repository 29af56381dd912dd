//! Session resolution.
//!
//! Produces the same normalized [`Session`] whichever backend authenticated
//! the request:
//!
//! - Hosted identity: verified bearer token, role read from `users` by email
//! - Local session: signed session cookie issued by our own login
//!
//! Nothing is cached between calls. Resolving twice on the same request
//! does the same work twice and returns equal values.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use super::cookie::SessionCookies;
use super::provider::AuthProvider;
use super::token::TokenDecoder;
use crate::common::Role;
use crate::domains::users::UserStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// Request-scoped authenticated session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: SessionUser,
    /// ISO-8601, millisecond precision, UTC (`2033-05-18T03:33:19.000Z`)
    pub expires: String,
}

impl Session {
    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn has_any_role(&self, allowed: &[Role]) -> bool {
        allowed.contains(&self.user.role)
    }
}

/// Format a seconds-since-epoch expiry the way session JSON carries it
pub fn format_expiry(exp_secs: i64) -> Option<String> {
    let millis = exp_secs.checked_mul(1000)?;
    let at = DateTime::<Utc>::from_timestamp_millis(millis)?;
    Some(at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Part of an email address before the `@`
pub fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// What to do when the role lookup itself fails (store unreachable, bad row)
///
/// A missing row is not a failure; it always resolves to `USER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoleLookupFailurePolicy {
    /// Keep the session, with role `USER`
    #[default]
    DefaultToUser,
    /// Drop the session; the request is unauthenticated
    Deny,
}

impl FromStr for RoleLookupFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default-user" | "default_user" | "user" => Ok(Self::DefaultToUser),
            "deny" | "fail-closed" => Ok(Self::Deny),
            other => anyhow::bail!(
                "Unknown role lookup failure policy '{}' (expected 'default-user' or 'deny')",
                other
            ),
        }
    }
}

enum Backend {
    Hosted {
        decoder: Arc<TokenDecoder>,
        users: Arc<dyn UserStore>,
        on_lookup_failure: RoleLookupFailurePolicy,
    },
    Local {
        cookies: Arc<SessionCookies>,
    },
}

/// Resolves the session for a request. Built once at startup for one provider.
pub struct SessionResolver {
    backend: Backend,
}

impl SessionResolver {
    pub fn hosted(
        decoder: Arc<TokenDecoder>,
        users: Arc<dyn UserStore>,
        on_lookup_failure: RoleLookupFailurePolicy,
    ) -> Self {
        Self {
            backend: Backend::Hosted {
                decoder,
                users,
                on_lookup_failure,
            },
        }
    }

    pub fn local(cookies: Arc<SessionCookies>) -> Self {
        Self {
            backend: Backend::Local { cookies },
        }
    }

    pub fn provider(&self) -> AuthProvider {
        match self.backend {
            Backend::Hosted { .. } => AuthProvider::HostedIdentity,
            Backend::Local { .. } => AuthProvider::LocalSession,
        }
    }

    /// Resolve the request's session, or `None` if it is not authenticated.
    pub async fn resolve(&self, headers: &HeaderMap) -> Option<Session> {
        match &self.backend {
            Backend::Hosted {
                decoder,
                users,
                on_lookup_failure,
            } => resolve_bearer(headers, decoder, users.as_ref(), *on_lookup_failure).await,
            Backend::Local { cookies } => cookies.session_from_headers(headers),
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header. The prefix is required.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

async fn resolve_bearer(
    headers: &HeaderMap,
    decoder: &TokenDecoder,
    users: &dyn UserStore,
    on_lookup_failure: RoleLookupFailurePolicy,
) -> Option<Session> {
    let Some(token) = bearer_token(headers) else {
        debug!("No bearer token on request");
        return None;
    };

    let claims = match decoder.decode(token).await {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, "Bearer token rejected");
            return None;
        }
    };

    let Some(email) = claims.email.as_deref().filter(|e| !e.is_empty()) else {
        debug!(sub = %claims.sub, "Token has no email claim");
        return None;
    };

    let role = match users.find_role_by_email(email).await {
        Ok(Some(role)) => role,
        Ok(None) => Role::User,
        Err(e) => {
            warn!(error = %e, email = %email, "Role lookup failed");
            match on_lookup_failure {
                RoleLookupFailurePolicy::DefaultToUser => Role::User,
                RoleLookupFailurePolicy::Deny => return None,
            }
        }
    };

    let Some(expires) = format_expiry(claims.exp) else {
        debug!(exp = claims.exp, "Token expiry out of range");
        return None;
    };

    let name = claims
        .name
        .clone()
        .unwrap_or_else(|| email_local_part(email).to_string());

    Some(Session {
        user: SessionUser {
            id: claims.sub.clone(),
            email: email.to_string(),
            name,
            role,
        },
        expires,
    })
}
