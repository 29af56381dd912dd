use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which authentication backend is live for this process.
///
/// Chosen once from configuration at startup and handed to the
/// [`SessionResolver`](super::SessionResolver); the two modes never mix
/// within one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    /// Bearer tokens issued by the hosted identity service, role looked up in `users`
    #[serde(rename = "hosted")]
    HostedIdentity,
    /// Signed session cookie issued by our own credentials login
    #[serde(rename = "local")]
    LocalSession,
}

impl AuthProvider {
    pub fn is_external_identity_mode(&self) -> bool {
        matches!(self, AuthProvider::HostedIdentity)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::HostedIdentity => "hosted",
            AuthProvider::LocalSession => "local",
        }
    }

    /// Legacy boolean switch (`USE_HOSTED_AUTH=true`).
    pub fn from_flag(hosted: bool) -> Self {
        if hosted {
            AuthProvider::HostedIdentity
        } else {
            AuthProvider::LocalSession
        }
    }
}

impl Default for AuthProvider {
    fn default() -> Self {
        AuthProvider::LocalSession
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hosted" | "external" => Ok(AuthProvider::HostedIdentity),
            "local" | "credentials" => Ok(AuthProvider::LocalSession),
            other => anyhow::bail!(
                "Unknown auth provider '{}' (expected 'hosted' or 'local')",
                other
            ),
        }
    }
}
