//! Image and job retention sweep.
//!
//! Generated images are kept for [`IMAGE_RETENTION_DAYS`]; after that both
//! the rendition files and the database row are removed, files first so a
//! crash mid-sweep leaves the row behind for the next pass. Terminal jobs
//! older than the same window are purged alongside.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use abrahub_core::storage::{image_dir, IMAGE_RETENTION_DAYS};
use abrahub_db::repositories::{GeneratedImageRepo, GenerationJobRepo};

/// How often the retention sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(6 * 3600);

/// Cap per pass so one sweep cannot hold the pool for long; leftovers are
/// picked up next pass.
const BATCH_LIMIT: i64 = 500;

pub async fn run(pool: PgPool, image_root: PathBuf, cancel: CancellationToken) {
    tracing::info!(
        retention_days = IMAGE_RETENTION_DAYS,
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Retention sweep started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Retention sweep stopping");
                break;
            }
            _ = interval.tick() => {
                if let Err(e) = sweep(&pool, &image_root).await {
                    tracing::error!(error = %e, "Retention sweep failed");
                }
            }
        }
    }
}

async fn sweep(pool: &PgPool, image_root: &std::path::Path) -> Result<(), sqlx::Error> {
    let cutoff = Utc::now() - chrono::Duration::days(IMAGE_RETENTION_DAYS);

    let expired = GeneratedImageRepo::expired(pool, cutoff, BATCH_LIMIT).await?;
    let mut removed = 0u64;

    for image in expired {
        let dir = image_dir(image_root, image.account_id, image.id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                // Keep the row so the files are retried next pass.
                tracing::warn!(image_id = image.id, error = %e, "Failed to remove rendition files");
                continue;
            }
        }
        if GeneratedImageRepo::delete(pool, image.id).await? {
            removed += 1;
        }
    }

    let purged_jobs = GenerationJobRepo::purge_older_than(pool, cutoff).await?;

    if removed > 0 || purged_jobs > 0 {
        tracing::info!(removed, purged_jobs, "Retention sweep purged expired data");
    } else {
        tracing::debug!("Retention sweep found nothing to purge");
    }

    Ok(())
}
