//! Auth domain actions - business logic functions
//!
//! Actions are async functions called directly from the HTTP routes.

mod login;
mod register;
mod sync_user;

pub use login::{login, LoginResult};
pub use register::{register_user, RegisterInput};
pub use sync_user::sync_external_user;
