use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{
    decode, decode_header, errors::ErrorKind, Algorithm, DecodingKey, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::jwks::JwksClient;

/// Claims read from a bearer token
///
/// Only `sub` and `exp` are required; the hosted identity service issues
/// base attributes and nothing about roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Expiry, seconds since epoch
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("No verification key for kid {0:?}")]
    UnknownKey(Option<String>),

    #[error("Token rejected: {0}")]
    Rejected(String),

    #[error("Failed to load signing keys: {0}")]
    KeySet(#[source] anyhow::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => TokenError::Malformed(err.to_string()),
            _ => TokenError::Rejected(err.to_string()),
        }
    }
}

/// Where verification keys come from
pub enum KeySource {
    /// HMAC shared secret (HS256)
    Shared(DecodingKey),
    /// Issuer's published JSON Web Key Set
    Jwks(JwksClient),
}

/// Decodes and verifies bearer tokens
pub struct TokenDecoder {
    keys: KeySource,
    issuer: Option<String>,
    audience: Option<String>,
}

impl TokenDecoder {
    pub fn new(keys: KeySource) -> Self {
        Self {
            keys,
            issuer: None,
            audience: None,
        }
    }

    pub fn with_shared_secret(secret: &str) -> Self {
        Self::new(KeySource::Shared(DecodingKey::from_secret(secret.as_bytes())))
    }

    pub fn with_jwks(client: JwksClient) -> Self {
        Self::new(KeySource::Jwks(client))
    }

    pub fn issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    pub fn audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }

    /// Verify a token and return its claims.
    ///
    /// Structural problems (wrong segment count, payload that is not a JSON
    /// object) are reported before any key lookup happens.
    pub async fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        inspect_payload(token)?;

        let header = decode_header(token)?;

        let (key, algorithm) = match &self.keys {
            KeySource::Shared(key) => (key.clone(), Algorithm::HS256),
            KeySource::Jwks(client) => {
                let key = client.key_for(header.kid.as_deref()).await?;
                // Key family is checked against the header algorithm by jsonwebtoken
                (key, header.alg)
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let data = decode::<Claims>(token, &key, &validation)?;
        Ok(data.claims)
    }
}

/// Split a compact JWT and decode its payload segment without verifying anything.
///
/// Fails unless there are exactly three segments and the middle one is
/// base64url-encoded JSON object text.
pub fn inspect_payload(token: &str) -> Result<serde_json::Map<String, serde_json::Value>, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::Malformed(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(segments[1].trim_end_matches('='))
        .map_err(|e| TokenError::Malformed(format!("payload is not base64url: {}", e)))?;

    match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(TokenError::Malformed("payload is not a JSON object".into())),
        Err(e) => Err(TokenError::Malformed(format!("payload is not JSON: {}", e))),
    }
}
