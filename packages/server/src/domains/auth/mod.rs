//! Auth domain - session resolution and access control
//!
//! Two mutually exclusive backends, chosen once at startup:
//! - Hosted identity: bearer tokens from the identity service, verified
//!   against its key set, role read from the `users` table
//! - Local session: credentials login issuing a signed session cookie
//!
//! Responsibilities:
//! - Token decoding and signature verification
//! - Normalized `Session` resolution for either backend
//! - Role gate (401 / 403) for handlers
//! - Registration, login and hosted-identity sync

pub mod actions;
pub mod cookie;
pub mod errors;
pub mod gate;
pub mod jwks;
pub mod password;
pub mod provider;
pub mod session;
pub mod token;

pub use cookie::{SessionCookies, SESSION_COOKIE_NAME};
pub use errors::AuthError;
pub use gate::{require_authenticated, require_role, AdminSession, AuthRejection, AuthSession};
pub use jwks::JwksClient;
pub use provider::AuthProvider;
pub use session::{RoleLookupFailurePolicy, Session, SessionResolver, SessionUser};
pub use token::{Claims, KeySource, TokenDecoder, TokenError};
