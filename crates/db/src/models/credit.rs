//! Credit wallet and ledger entities.

use serde::Serialize;
use sqlx::FromRow;

use abrahub_core::types::{DbId, Timestamp};

/// Materialized wallet balance for one account.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CreditWallet {
    pub id: DbId,
    pub account_id: DbId,
    pub balance: i64,
    pub monthly_allowance: i64,
    pub updated_at: Timestamp,
}

/// One append-only ledger row: a signed delta with its reason.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LedgerEntry {
    pub id: DbId,
    pub account_id: DbId,
    pub delta: i64,
    pub reason: String,
    pub reference: Option<String>,
    pub created_at: Timestamp,
}

/// Canonical ledger reasons. Free-form strings are not accepted so the
/// ledger stays queryable.
pub mod reason {
    /// Monthly allowance reset from a paid billing event.
    pub const BILLING_RESET: &str = "billing_reset";
    /// Balance forced to zero by a refund/chargeback event.
    pub const BILLING_REVOKED: &str = "billing_revoked";
    /// Manual grant by an administrator.
    pub const ADMIN_GRANT: &str = "admin_grant";
    /// Zeroed by the grace-period expiration sweep.
    pub const GRACE_EXPIRED: &str = "grace_expired";
    /// Spent on a generation (metered deployments only).
    pub const GENERATION: &str = "generation";
}
