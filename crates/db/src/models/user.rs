//! User account entity.

use serde::Serialize;
use sqlx::FromRow;

use abrahub_core::types::{DbId, Timestamp};

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: Timestamp,
}

/// Role name granting administrative access.
pub const ROLE_ADMIN: &str = "admin";

/// Default role for self-service signups.
pub const ROLE_USER: &str = "user";
