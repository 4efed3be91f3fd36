//! Authentication middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`auth::AdminUser`] -- Requires the `admin` role.

pub mod auth;
