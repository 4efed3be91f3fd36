//! Entitlement entity: the authoritative record of an account's plan,
//! billing status, and access restrictions.

use serde::Serialize;
use sqlx::FromRow;

use abrahub_core::types::{DbId, Timestamp};

/// A row from the `entitlements` table.
///
/// `grace_until` is the single authoritative grace-period signal;
/// `downgraded_at` is recorded for audit only and never drives behavior.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Entitlement {
    pub id: DbId,
    pub account_id: DbId,
    pub plan: String,
    pub status: String,
    pub current_period_end: Option<Timestamp>,
    pub grace_until: Option<Timestamp>,
    pub downgraded_at: Option<Timestamp>,
    pub is_blocked: bool,
    pub blocked_reason: Option<String>,
    pub updated_at: Timestamp,
}

/// Entitlement status strings stored in the `status` column.
pub mod status {
    pub const ACTIVE: &str = "active";
    pub const INACTIVE: &str = "inactive";
    pub const TRIALING: &str = "trialing";
    pub const PAST_DUE: &str = "past_due";
    pub const CANCELED: &str = "canceled";
}
