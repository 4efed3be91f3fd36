//! Sign-up whitelist entity.

use serde::Serialize;
use sqlx::FromRow;

use abrahub_core::types::{DbId, Timestamp};

/// A row from the `authorized_users` table.
///
/// Emails are stored lower-cased; billing events may create rows here
/// before the matching account exists.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuthorizedUser {
    pub id: DbId,
    pub email: String,
    pub status: String,
    pub stripe_customer_id: Option<String>,
    pub updated_at: Timestamp,
}

/// Whitelist status strings.
pub mod status {
    pub const ACTIVE: &str = "active";
    pub const INACTIVE: &str = "inactive";
}
