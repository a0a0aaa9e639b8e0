//! HTTP middleware.

pub mod auth;

pub use auth::{bearer_credential, require_identity, AuthGate, AuthRejection};
