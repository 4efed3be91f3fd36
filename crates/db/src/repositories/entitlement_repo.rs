//! Repository for the `entitlements` table.

use sqlx::PgPool;

use abrahub_core::types::{DbId, Timestamp};

use crate::models::entitlement::{status, Entitlement};

const COLUMNS: &str = "\
    id, account_id, plan, status, current_period_end, grace_until, \
    downgraded_at, is_blocked, blocked_reason, updated_at";

/// Provides entitlement state transitions.
pub struct EntitlementRepo;

impl EntitlementRepo {
    pub async fn find_by_account(
        pool: &PgPool,
        account_id: DbId,
    ) -> Result<Option<Entitlement>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM entitlements WHERE account_id = $1");
        sqlx::query_as::<_, Entitlement>(&query)
            .bind(account_id)
            .fetch_optional(pool)
            .await
    }

    /// Create the default free entitlement at signup.
    pub async fn create_free(pool: &PgPool, account_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO entitlements (account_id, plan, status) \
             VALUES ($1, 'free', $2) \
             ON CONFLICT (account_id) DO NOTHING",
        )
        .bind(account_id)
        .bind(status::INACTIVE)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Activate a plan from a paid billing event. Clears any block and
    /// grace state from a previous downgrade.
    pub async fn upsert_active(
        pool: &PgPool,
        account_id: DbId,
        plan: &str,
        current_period_end: Option<Timestamp>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO entitlements (account_id, plan, status, current_period_end) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (account_id) \
             DO UPDATE SET plan = $2, status = $3, current_period_end = $4, \
                           grace_until = NULL, downgraded_at = NULL, \
                           is_blocked = FALSE, blocked_reason = NULL, \
                           updated_at = NOW()",
        )
        .bind(account_id)
        .bind(plan)
        .bind(status::ACTIVE)
        .bind(current_period_end)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Update plan/status from the pull-model subscription check.
    ///
    /// Deliberately narrower than [`Self::upsert_active`]: never touches
    /// the block flag or grace state, and the caller must never credit the
    /// wallet on this path.
    pub async fn upsert_plan(
        pool: &PgPool,
        account_id: DbId,
        plan: &str,
        sub_status: &str,
        current_period_end: Option<Timestamp>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO entitlements (account_id, plan, status, current_period_end) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (account_id) \
             DO UPDATE SET plan = $2, status = $3, current_period_end = $4, \
                           updated_at = NOW()",
        )
        .bind(account_id)
        .bind(plan)
        .bind(sub_status)
        .bind(current_period_end)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Start the grace window after a lapsed payment. Keeps the plan and
    /// the wallet untouched; `COALESCE` preserves an already-running
    /// deadline so repeated past-due events cannot extend it.
    pub async fn start_grace(
        pool: &PgPool,
        account_id: DbId,
        grace_until: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE entitlements \
             SET status = $2, grace_until = COALESCE(grace_until, $3), \
                 updated_at = NOW() \
             WHERE account_id = $1",
        )
        .bind(account_id)
        .bind(status::PAST_DUE)
        .bind(grace_until)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Block an account after a refund/chargeback/cancellation event.
    pub async fn mark_inactive_blocked(
        pool: &PgPool,
        account_id: DbId,
        blocked_reason: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO entitlements (account_id, status, is_blocked, blocked_reason) \
             VALUES ($1, $2, TRUE, $3) \
             ON CONFLICT (account_id) \
             DO UPDATE SET status = $2, is_blocked = TRUE, blocked_reason = $3, \
                           updated_at = NOW()",
        )
        .bind(account_id)
        .bind(status::INACTIVE)
        .bind(blocked_reason)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Entitlements whose grace period has expired (`grace_until` in the
    /// past). `grace_until` is the only signal consulted.
    pub async fn expired_grace(pool: &PgPool) -> Result<Vec<Entitlement>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM entitlements \
             WHERE grace_until IS NOT NULL AND grace_until < NOW()"
        );
        sqlx::query_as::<_, Entitlement>(&query).fetch_all(pool).await
    }

    /// Finish a grace-period downgrade: plan=free, grace cleared,
    /// `downgraded_at` stamped for audit. The wallet zeroing happens
    /// separately via the credit ledger.
    pub async fn force_downgrade(pool: &PgPool, account_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE entitlements \
             SET plan = 'free', status = $2, grace_until = NULL, \
                 downgraded_at = NOW(), updated_at = NOW() \
             WHERE account_id = $1",
        )
        .bind(account_id)
        .bind(status::INACTIVE)
        .execute(pool)
        .await?;
        Ok(())
    }
}
