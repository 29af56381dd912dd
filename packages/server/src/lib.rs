// LembarKerja - API Core
//
// Session and auth resolution for the LembarKerja workspace. One process runs
// either against a hosted identity provider (bearer tokens) or with local
// credential sessions (signed cookies); see domains/auth.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
