// HTTP routes
pub mod admin;
pub mod auth;
pub mod health;
pub mod me;

pub use admin::*;
pub use auth::*;
pub use health::*;
pub use me::*;
