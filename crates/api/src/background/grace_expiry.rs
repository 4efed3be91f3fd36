//! Grace-period expiration sweep.
//!
//! Accounts whose `grace_until` has passed are downgraded to the free plan
//! and their remaining balance is zeroed through the ledger. The sweep is
//! idempotent: a re-run (or a crash between accounts) observes a zero
//! balance and a cleared `grace_until` and writes nothing.

use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use abrahub_db::models::credit::reason;
use abrahub_db::repositories::{CreditRepo, EntitlementRepo};

/// How often expired grace periods are collected.
const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

pub async fn run(pool: PgPool, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Grace expiry sweep started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Grace expiry sweep stopping");
                break;
            }
            _ = interval.tick() => {
                if let Err(e) = sweep(&pool).await {
                    tracing::error!(error = %e, "Grace expiry sweep failed");
                }
            }
        }
    }
}

async fn sweep(pool: &PgPool) -> Result<(), sqlx::Error> {
    let expired = EntitlementRepo::expired_grace(pool).await?;
    if expired.is_empty() {
        return Ok(());
    }

    tracing::info!(count = expired.len(), "Expiring lapsed grace periods");

    // One failing account must not block the rest of the batch; it is
    // retried on the next sweep because its grace_until is still set.
    for entitlement in expired {
        if let Err(e) = expire_one(pool, entitlement.account_id).await {
            tracing::error!(
                account_id = entitlement.account_id,
                error = %e,
                "Failed to expire grace period",
            );
        }
    }

    Ok(())
}

async fn expire_one(pool: &PgPool, account_id: i64) -> Result<(), sqlx::Error> {
    let zeroed = CreditRepo::zero_if_positive(pool, account_id, reason::GRACE_EXPIRED).await?;
    CreditRepo::set_allowance(pool, account_id, 0).await?;
    EntitlementRepo::force_downgrade(pool, account_id).await?;

    tracing::info!(account_id, zeroed, "Grace period expired, account downgraded");
    Ok(())
}
