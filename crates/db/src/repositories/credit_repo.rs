//! Repository for the credit ledger and its materialized wallet.
//!
//! Every balance mutation is an append to `credit_ledger` plus an update of
//! `credit_wallets.balance` inside one transaction. There is no plain
//! "set balance" UPDATE anywhere — concurrent mutators (webhooks, admin
//! grants, the grace sweep) can interleave without lost updates because the
//! balance column only ever moves by applied deltas.

use sqlx::{PgPool, Postgres, Transaction};

use abrahub_core::types::DbId;

use crate::models::credit::CreditWallet;

/// Provides ledger-backed wallet operations.
pub struct CreditRepo;

impl CreditRepo {
    /// Fetch an account's wallet, if one has ever been created.
    pub async fn find_wallet(
        pool: &PgPool,
        account_id: DbId,
    ) -> Result<Option<CreditWallet>, sqlx::Error> {
        sqlx::query_as::<_, CreditWallet>(
            "SELECT id, account_id, balance, monthly_allowance, updated_at \
             FROM credit_wallets WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_optional(pool)
        .await
    }

    /// Apply a signed delta to an account's balance.
    ///
    /// Creates the wallet lazily on first use. The balance is floored at
    /// zero: a spend larger than the current balance is clamped to what is
    /// actually available before it reaches the ledger, so the ledger
    /// always sums to the materialized balance. A spend from an empty
    /// wallet writes nothing. Returns the new balance.
    pub async fn apply(
        pool: &PgPool,
        account_id: DbId,
        delta: i64,
        reason: &str,
        reference: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let current = Self::lock_balance(&mut tx, account_id).await?;
        let applied = delta.max(-current);
        let balance = if applied != 0 {
            Self::apply_in_tx(&mut tx, account_id, applied, reason, reference).await?
        } else {
            current
        };

        tx.commit().await?;
        Ok(balance)
    }

    /// Set the balance to an absolute target, recorded as the delta needed
    /// to reach it. Used by billing resets and revocations. Returns the
    /// applied delta.
    pub async fn set_balance(
        pool: &PgPool,
        account_id: DbId,
        target: i64,
        reason: &str,
        reference: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let current = Self::lock_balance(&mut tx, account_id).await?;
        let delta = target - current;
        if delta != 0 {
            Self::apply_in_tx(&mut tx, account_id, delta, reason, reference).await?;
        }

        tx.commit().await?;
        Ok(delta)
    }

    /// Zero the balance only when it is currently positive.
    ///
    /// The idempotence primitive for the expiration sweep: the first run
    /// records a negative ledger entry, the second observes zero and writes
    /// nothing. Returns `true` when a zeroing was performed.
    pub async fn zero_if_positive(
        pool: &PgPool,
        account_id: DbId,
        reason: &str,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let current = Self::lock_balance(&mut tx, account_id).await?;
        if current <= 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        Self::apply_in_tx(&mut tx, account_id, -current, reason, None).await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Update the monthly allowance (the baseline restored on renewal).
    pub async fn set_allowance(
        pool: &PgPool,
        account_id: DbId,
        allowance: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO credit_wallets (account_id, monthly_allowance) \
             VALUES ($1, $2) \
             ON CONFLICT (account_id) \
             DO UPDATE SET monthly_allowance = $2, updated_at = NOW()",
        )
        .bind(account_id)
        .bind(allowance)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Read the current balance with a row lock, creating the wallet if
    /// missing, so a concurrent mutator cannot slip between read and write.
    async fn lock_balance(
        tx: &mut Transaction<'_, Postgres>,
        account_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query("INSERT INTO credit_wallets (account_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(account_id)
            .execute(&mut **tx)
            .await?;

        sqlx::query_scalar(
            "SELECT balance FROM credit_wallets WHERE account_id = $1 FOR UPDATE",
        )
        .bind(account_id)
        .fetch_one(&mut **tx)
        .await
    }

    /// Append a ledger row and move the balance by the same delta.
    ///
    /// Callers hold the wallet row lock via `lock_balance` (which also
    /// created the row) and pass a delta that cannot take the balance
    /// negative, so a plain increment keeps ledger and balance in
    /// lockstep.
    async fn apply_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        account_id: DbId,
        delta: i64,
        reason: &str,
        reference: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query(
            "INSERT INTO credit_ledger (account_id, delta, reason, reference) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(account_id)
        .bind(delta)
        .bind(reason)
        .bind(reference)
        .execute(&mut **tx)
        .await?;

        sqlx::query_scalar(
            "UPDATE credit_wallets \
             SET balance = balance + $2, updated_at = NOW() \
             WHERE account_id = $1 \
             RETURNING balance",
        )
        .bind(account_id)
        .bind(delta)
        .fetch_one(&mut **tx)
        .await
    }
}
