//! Repository for the `authorized_users` signup whitelist.
//!
//! Emails are normalized to lowercase at the repository boundary so every
//! caller gets the same matching behavior.

use sqlx::PgPool;

use crate::models::whitelist::AuthorizedUser;

const COLUMNS: &str = "id, email, status, stripe_customer_id, updated_at";

pub struct WhitelistRepo;

impl WhitelistRepo {
    /// Look up a whitelist row by email (case-insensitive).
    pub async fn find_by_email(
        pool: &PgPool,
        email: &str,
    ) -> Result<Option<AuthorizedUser>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM authorized_users WHERE email = $1");
        sqlx::query_as::<_, AuthorizedUser>(&query)
            .bind(email.trim().to_lowercase())
            .fetch_optional(pool)
            .await
    }

    /// True when an active whitelist row exists for the email. This is the
    /// server-side signup gate.
    pub async fn is_active(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
        let active: Option<bool> = sqlx::query_scalar(
            "SELECT status = 'active' FROM authorized_users WHERE email = $1",
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await?;
        Ok(active.unwrap_or(false))
    }

    /// Upsert the whitelist status for an email, driven by billing events.
    /// May run before the matching account exists.
    pub async fn upsert_status(
        pool: &PgPool,
        email: &str,
        status: &str,
        stripe_customer_id: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO authorized_users (email, status, stripe_customer_id) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (email) \
             DO UPDATE SET status = $2, \
                           stripe_customer_id = COALESCE($3, authorized_users.stripe_customer_id), \
                           updated_at = NOW()",
        )
        .bind(email.trim().to_lowercase())
        .bind(status)
        .bind(stripe_customer_id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
