//! Local session framework: sessions carried in a signed cookie.
//!
//! Used when the process runs in [`AuthProvider::LocalSession`](super::AuthProvider)
//! mode. The cookie value is an HS256 JWT holding the whole session, so no
//! server-side session store exists. Logging out just expires the cookie.

use anyhow::Result;
use axum::http::{header::COOKIE, HeaderMap};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::session::{format_expiry, Session, SessionUser};
use super::token::TokenError;
use crate::common::Role;

pub const SESSION_COOKIE_NAME: &str = "lembarkerja.session-token";

#[derive(Debug, Serialize, Deserialize)]
struct CookieClaims {
    sub: String,
    email: String,
    name: String,
    role: Role,
    exp: i64,
    iat: i64,
}

/// Issues and verifies session cookies
pub struct SessionCookies {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    max_age: chrono::Duration,
    secure: bool,
}

impl SessionCookies {
    pub fn new(secret: &str, max_age: chrono::Duration, secure: bool) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            max_age,
            secure,
        }
    }

    /// Sign a session for `user`, returning the cookie value and the session it carries
    pub fn issue(&self, user: SessionUser) -> Result<(String, Session)> {
        let now = chrono::Utc::now();
        let exp = (now + self.max_age).timestamp();

        let claims = CookieClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            exp,
            iat: now.timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding_key)?;

        let expires = format_expiry(exp)
            .ok_or_else(|| anyhow::anyhow!("Session expiry out of range: {}", exp))?;

        Ok((token, Session { user, expires }))
    }

    /// Verify a cookie value and rebuild its session
    pub fn verify(&self, token: &str) -> Result<Session, TokenError> {
        let mut validation = Validation::default();
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<CookieClaims>(token, &self.decoding_key, &validation)?.claims;
        let expires = format_expiry(claims.exp)
            .ok_or_else(|| TokenError::Rejected(format!("expiry out of range: {}", claims.exp)))?;

        Ok(Session {
            user: SessionUser {
                id: claims.sub,
                email: claims.email,
                name: claims.name,
                role: claims.role,
            },
            expires,
        })
    }

    pub fn session_from_headers(&self, headers: &HeaderMap) -> Option<Session> {
        let token = read_cookie(headers, SESSION_COOKIE_NAME)?;
        match self.verify(token) {
            Ok(session) => Some(session),
            Err(e) => {
                debug!(error = %e, "Session cookie rejected");
                None
            }
        }
    }

    /// `Set-Cookie` value installing a session
    pub fn set_cookie(&self, token: &str) -> String {
        self.cookie_header(token, self.max_age.num_seconds())
    }

    /// `Set-Cookie` value removing the session
    pub fn clear_cookie(&self) -> String {
        self.cookie_header("", 0)
    }

    fn cookie_header(&self, value: &str, max_age: i64) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE_NAME, value, max_age
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Value of cookie `name` from the request's `Cookie` headers
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
