//! Queue wake-up watchdog.
//!
//! Safety net behind the admission-time [`QueueSignal`]: if a wake-up is
//! ever lost (processor restart, crash between insert and notify), queued
//! jobs would otherwise sit until the processor's slow poll. The watchdog
//! re-nudges the processor when jobs have been waiting with nothing in
//! flight, and returns jobs stuck in `processing` to the queue.
//!
//! [`QueueSignal`]: crate::signal::QueueSignal

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use abrahub_db::repositories::GenerationJobRepo;

use crate::signal::QueueSignal;

/// How often the watchdog inspects the queue.
const WATCHDOG_INTERVAL: Duration = Duration::from_secs(120);

/// A queued job younger than this is presumed already signalled; nudging
/// for it would just race the processor's normal path.
const MIN_QUEUED_WAIT: chrono::Duration = chrono::Duration::seconds(30);

/// A `processing` job older than this is considered abandoned (processor
/// died mid-job) and is returned to the queue.
const STALE_PROCESSING: chrono::Duration = chrono::Duration::minutes(10);

pub async fn run(pool: PgPool, signal: Arc<QueueSignal>, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = WATCHDOG_INTERVAL.as_secs(),
        "Queue watchdog started"
    );

    let mut interval = tokio::time::interval(WATCHDOG_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Queue watchdog stopping");
                break;
            }
            _ = interval.tick() => {
                if let Err(e) = sweep(&pool, &signal).await {
                    tracing::error!(error = %e, "Queue watchdog sweep failed");
                }
            }
        }
    }
}

async fn sweep(pool: &PgPool, signal: &QueueSignal) -> Result<(), sqlx::Error> {
    let requeued = GenerationJobRepo::requeue_stale(pool, Utc::now() - STALE_PROCESSING).await?;
    if requeued > 0 {
        tracing::warn!(requeued, "Returned stale processing jobs to the queue");
    }

    let stats = GenerationJobRepo::queue_stats(pool).await?;
    if stats.queued == 0 || stats.processing > 0 {
        return Ok(());
    }

    let Some(oldest) = GenerationJobRepo::oldest_queued_at(pool).await? else {
        return Ok(());
    };

    let waited = Utc::now() - oldest;
    if requeued > 0 || waited >= MIN_QUEUED_WAIT {
        tracing::info!(
            queued = stats.queued,
            waited_secs = waited.num_seconds(),
            "Queue stalled with nothing in flight, waking processor",
        );
        signal.notify();
    }

    Ok(())
}
