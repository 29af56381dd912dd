//! Users domain - accounts, roles and the store they live in
//!
//! Responsibilities:
//! - `users` table access (Postgres)
//! - `UserStore` trait so auth code can be tested without a database

pub mod models;
pub mod store;

pub use models::{normalize_email, ExternalIdentity, NewUser, User};
pub use store::{PgUserStore, UserStore, UserStoreError};
