pub mod user;

pub use user::{normalize_email, ExternalIdentity, NewUser, User};
