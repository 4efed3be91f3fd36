pub mod auth;
pub mod billing;
pub mod queue;

use sqlx::PgPool;

use abrahub_core::error::CoreError;
use abrahub_core::types::DbId;
use abrahub_db::repositories::EntitlementRepo;

use crate::error::{AppError, AppResult};

/// Refuse the request when the account's entitlement carries the blocked
/// flag. Enforced regardless of plan or wallet balance, on every
/// generation and purchase path.
pub(crate) async fn ensure_not_blocked(pool: &PgPool, account_id: DbId) -> AppResult<()> {
    let entitlement = EntitlementRepo::find_by_account(pool, account_id).await?;
    if let Some(ent) = entitlement {
        if ent.is_blocked {
            return Err(AppError::Core(CoreError::Blocked(
                "This account is blocked. Contact support.".into(),
            )));
        }
    }
    Ok(())
}
