// Common types and utilities shared across the application

pub mod errors;
pub mod role;

pub use errors::{ApiError, ErrorBody};
pub use role::{Role, UnknownRole, ADMIN_ROLES};
