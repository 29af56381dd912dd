// Rate limiting middleware using tower-governor
//
// Configuration:
// - Credential endpoints (register, login): burst of 5 per client IP,
//   one more request allowed every 2 seconds
// - Client IP is the TCP peer address (server must be started with connect
//   info). Forwarding headers are client-controlled and never used as the key.

use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::PeerIpKeyExtractor, GovernorLayer,
};

/// Wrap `router` with the per-IP limiter used for credential endpoints
pub fn with_auth_rate_limit(router: Router) -> Result<Router> {
    let config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(2) // Replenish one request every 2 seconds
            .burst_size(5)
            .use_headers()
            .finish()
            .context("Rate limiter configuration is invalid")?,
    );

    Ok(router.layer(GovernorLayer { config }))
}
