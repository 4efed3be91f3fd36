//! Repository for the `generation_jobs` table.
//!
//! Status transitions set their timestamps in the same SQL statement that
//! flips the status, so `started_at`/`completed_at` can never disagree with
//! the status column. Claims are atomic (`FOR UPDATE SKIP LOCKED`) to keep
//! processing at-most-once per job under concurrent processors.

use sqlx::PgPool;

use abrahub_core::types::{DbId, Timestamp};

use crate::models::generation_job::{GenerationJob, QueueStats, SubmitGenerationJob};
use crate::models::status::JobStatus;

/// Column list for `generation_jobs` queries.
const COLUMNS: &str = "\
    id, account_id, status_id, prompt, aspect_ratio, quality, preset_id, \
    focal_length, aperture, camera_angle, film_look, reference_images, \
    reference_type, use_own_key, credits_cost, result_image_id, \
    error_message, created_at, started_at, completed_at";

/// Provides queue operations for generation jobs.
pub struct GenerationJobRepo;

impl GenerationJobRepo {
    /// Admit a new job in `queued` status. Returns the created row.
    ///
    /// `credits_cost` is fixed at 0 at admission time; cost is attached to
    /// the ledger, not the job.
    pub async fn submit(
        pool: &PgPool,
        account_id: DbId,
        input: &SubmitGenerationJob,
        reference_type: Option<&str>,
    ) -> Result<GenerationJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO generation_jobs \
                 (account_id, status_id, prompt, aspect_ratio, quality, preset_id, \
                  focal_length, aperture, camera_angle, film_look, \
                  reference_images, reference_type, use_own_key) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(account_id)
            .bind(JobStatus::Queued.id())
            .bind(&input.prompt)
            .bind(&input.aspect_ratio)
            .bind(&input.quality)
            .bind(&input.preset_id)
            .bind(&input.focal_length)
            .bind(&input.aperture)
            .bind(&input.camera_angle)
            .bind(&input.film_look)
            .bind(serde_json::json!(input.reference_images))
            .bind(reference_type)
            .bind(input.use_own_key)
            .fetch_one(pool)
            .await
    }

    /// Atomically claim the oldest queued job.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so that with N concurrent
    /// claimers exactly one wins each job; the others observe nothing
    /// claimable and return `None`. The claim transitions queued →
    /// processing and sets `started_at` in the same statement.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<GenerationJob>, sqlx::Error> {
        let query = format!(
            "UPDATE generation_jobs \
             SET status_id = $1, started_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM generation_jobs \
                 WHERE status_id = $2 \
                 ORDER BY created_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(JobStatus::Processing.id())
            .bind(JobStatus::Queued.id())
            .fetch_optional(pool)
            .await
    }

    /// Mark a processing job completed, linking its result image.
    ///
    /// Guarded on `status_id = processing`: if the job was cancelled (row
    /// deleted) or already finalized, zero rows match and `false` is
    /// returned so the caller can discard the result.
    pub async fn complete(
        pool: &PgPool,
        job_id: DbId,
        result_image_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generation_jobs \
             SET status_id = $2, result_image_id = $3, completed_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(job_id)
        .bind(JobStatus::Completed.id())
        .bind(result_image_id)
        .bind(JobStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a processing job failed with an error message.
    pub async fn fail(pool: &PgPool, job_id: DbId, error: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generation_jobs \
             SET status_id = $2, error_message = $3, completed_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(job_id)
        .bind(JobStatus::Failed.id())
        .bind(error)
        .bind(JobStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Idempotent owner-scoped cancellation: delete the job row along with
    /// any image row already recorded for it.
    ///
    /// Returns the number of job rows removed (0 or 1). Deleting a job
    /// that does not exist, was already cancelled, or belongs to another
    /// account removes nothing and is not an error.
    pub async fn cancel_delete(
        pool: &PgPool,
        job_id: DbId,
        account_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let image_id: Option<DbId> = sqlx::query_scalar(
            "SELECT result_image_id FROM generation_jobs \
             WHERE id = $1 AND account_id = $2",
        )
        .bind(job_id)
        .bind(account_id)
        .fetch_optional(&mut *tx)
        .await?
        .flatten();

        let deleted = sqlx::query(
            "DELETE FROM generation_jobs WHERE id = $1 AND account_id = $2",
        )
        .bind(job_id)
        .bind(account_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if let Some(image_id) = image_id {
            sqlx::query("DELETE FROM generated_images WHERE id = $1 AND account_id = $2")
                .bind(image_id)
                .bind(account_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(deleted)
    }

    /// Find a job by id, scoped to its owning account.
    pub async fn find_for_account(
        pool: &PgPool,
        job_id: DbId,
        account_id: DbId,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generation_jobs WHERE id = $1 AND account_id = $2"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(job_id)
            .bind(account_id)
            .fetch_optional(pool)
            .await
    }

    /// 1-indexed rank of a job among queued jobs ordered by creation time.
    ///
    /// Returns 0 when the job is not in `queued` status. Recomputed on
    /// every call — never cached — since the queue shifts as jobs finish.
    pub async fn position(pool: &PgPool, job_id: DbId) -> Result<i64, sqlx::Error> {
        // Counts queued jobs at-or-before the target (including the target
        // itself), tie-broken by id. The join is empty when the target is
        // not queued, so COUNT collapses to 0.
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM generation_jobs o, generation_jobs t \
             WHERE t.id = $1 AND t.status_id = $2 \
               AND o.status_id = $2 \
               AND (o.created_at, o.id) <= (t.created_at, t.id)",
        )
        .bind(job_id)
        .bind(JobStatus::Queued.id())
        .fetch_one(pool)
        .await
    }

    /// All queued/processing jobs for one account, oldest first.
    pub async fn active_for_account(
        pool: &PgPool,
        account_id: DbId,
    ) -> Result<Vec<GenerationJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generation_jobs \
             WHERE account_id = $1 AND status_id IN ($2, $3) \
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(account_id)
            .bind(JobStatus::Queued.id())
            .bind(JobStatus::Processing.id())
            .fetch_all(pool)
            .await
    }

    /// Global queue statistics: counts plus today's average processing time.
    pub async fn queue_stats(pool: &PgPool) -> Result<QueueStats, sqlx::Error> {
        sqlx::query_as::<_, QueueStats>(
            "SELECT \
                 COUNT(*) FILTER (WHERE status_id = $1) AS queued, \
                 COUNT(*) FILTER (WHERE status_id = $2) AS processing, \
                 COUNT(*) FILTER (WHERE status_id = $3 \
                     AND completed_at >= date_trunc('day', NOW())) AS completed_today, \
                 AVG(EXTRACT(EPOCH FROM completed_at - started_at)) \
                     FILTER (WHERE status_id = $3 \
                         AND completed_at >= date_trunc('day', NOW()) \
                         AND started_at IS NOT NULL) AS avg_processing_secs \
             FROM generation_jobs",
        )
        .bind(JobStatus::Queued.id())
        .bind(JobStatus::Processing.id())
        .bind(JobStatus::Completed.id())
        .fetch_one(pool)
        .await
    }

    /// Creation time of the oldest queued job, if any. Used by the
    /// watchdog to decide whether the queue has stalled.
    pub async fn oldest_queued_at(pool: &PgPool) -> Result<Option<Timestamp>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT MIN(created_at) FROM generation_jobs WHERE status_id = $1",
        )
        .bind(JobStatus::Queued.id())
        .fetch_one(pool)
        .await
    }

    /// Return stuck `processing` jobs (started before `cutoff`) to the
    /// queue, clearing `started_at` so the next claim restarts the clock.
    ///
    /// Ordering fairness is preserved because claims sort by the original
    /// `created_at`.
    pub async fn requeue_stale(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generation_jobs \
             SET status_id = $1, started_at = NULL \
             WHERE status_id = $2 AND started_at < $3",
        )
        .bind(JobStatus::Queued.id())
        .bind(JobStatus::Processing.id())
        .bind(cutoff)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete terminal jobs completed before `cutoff`. Retention sweep.
    pub async fn purge_older_than(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM generation_jobs \
             WHERE status_id IN ($1, $2) AND completed_at < $3",
        )
        .bind(JobStatus::Completed.id())
        .bind(JobStatus::Failed.id())
        .bind(cutoff)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
