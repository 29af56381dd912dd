//! JSON Web Key Set client for the hosted identity service.
//!
//! Keys are fetched lazily and cached. A token signed with a `kid` we have
//! not seen triggers a refetch (the issuer rotated keys), but only one fetch
//! runs at a time and never more often than the refresh interval. If the key
//! is still missing the token is rejected.

use anyhow::Context;
use jsonwebtoken::{jwk::JwkSet, DecodingKey};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::token::TokenError;

/// Minimum time between two key set fetches
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

struct Remote {
    url: String,
    http: reqwest::Client,
}

pub struct JwksClient {
    remote: Option<Remote>,
    keys: RwLock<Option<JwkSet>>,
    /// Held while fetching; stores when the last fetch started
    last_refresh: Mutex<Option<Instant>>,
    refresh_interval: Duration,
}

impl JwksClient {
    /// Client that fetches keys from `url` on first use
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build key set HTTP client")?;

        Ok(Self {
            remote: Some(Remote {
                url: url.into(),
                http,
            }),
            keys: RwLock::new(None),
            last_refresh: Mutex::new(None),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        })
    }

    /// Client pinned to a fixed key set; never refetches
    pub fn from_key_set(keys: JwkSet) -> Self {
        Self {
            remote: None,
            keys: RwLock::new(Some(keys)),
            last_refresh: Mutex::new(None),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Find the verification key for a token header's `kid`.
    ///
    /// Without a `kid` the set must contain exactly one key. A miss refetches
    /// the set at most once per refresh interval, whatever the caller sends.
    pub async fn key_for(&self, kid: Option<&str>) -> Result<DecodingKey, TokenError> {
        if let Some(key) = self.cached_key(kid).await? {
            return Ok(key);
        }

        let Some(remote) = &self.remote else {
            return Err(TokenError::UnknownKey(kid.map(str::to_string)));
        };

        // One fetch at a time; waiters re-check the cache afterwards
        let mut last_refresh = self.last_refresh.lock().await;
        if let Some(key) = self.cached_key(kid).await? {
            return Ok(key);
        }

        if let Some(at) = *last_refresh {
            if at.elapsed() < self.refresh_interval {
                debug!(kid = ?kid, "Key set refreshed recently, not refetching");
                return Err(TokenError::UnknownKey(kid.map(str::to_string)));
            }
        }

        debug!(kid = ?kid, "Signing key not cached, refreshing key set");
        *last_refresh = Some(Instant::now());
        let set = fetch(remote).await.map_err(TokenError::KeySet)?;
        info!(url = %remote.url, keys = set.keys.len(), "Loaded signing keys");
        *self.keys.write().await = Some(set);
        drop(last_refresh);

        self.cached_key(kid)
            .await?
            .ok_or_else(|| TokenError::UnknownKey(kid.map(str::to_string)))
    }

    async fn cached_key(&self, kid: Option<&str>) -> Result<Option<DecodingKey>, TokenError> {
        let guard = self.keys.read().await;
        let Some(set) = guard.as_ref() else {
            return Ok(None);
        };

        let jwk = match kid {
            Some(kid) => set.find(kid),
            None if set.keys.len() == 1 => set.keys.first(),
            None => None,
        };

        match jwk {
            Some(jwk) => DecodingKey::from_jwk(jwk).map(Some).map_err(TokenError::from),
            None => Ok(None),
        }
    }
}

async fn fetch(remote: &Remote) -> anyhow::Result<JwkSet> {
    let set = remote
        .http
        .get(&remote.url)
        .send()
        .await
        .context("Failed to reach key set endpoint")?
        .error_for_status()
        .context("Key set endpoint returned an error")?
        .json::<JwkSet>()
        .await
        .context("Key set response is not a JWKS document")?;
    Ok(set)
}
