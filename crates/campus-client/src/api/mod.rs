//! API modules.

mod auth;

pub use auth::AuthApi;
