//! Background queue processor.
//!
//! A single long-lived Tokio task that drains the generation queue in FIFO
//! order. Woken by [`QueueSignal`] on every admission, with a periodic tick
//! as a backstop, it claims jobs one at a time via
//! [`GenerationJobRepo::claim_next`] (`FOR UPDATE SKIP LOCKED`), so running
//! several processors never double-processes a job.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use abrahub_core::retry::RetryConfig;
use abrahub_core::storage::{image_dir, rendition_path, Rendition};
use abrahub_db::models::generated_image::CreateGeneratedImage;
use abrahub_db::models::generation_job::GenerationJob;
use abrahub_db::repositories::{GeneratedImageRepo, GenerationJobRepo};
use abrahub_provider::client::{GenerationRequest, ProviderClient};
use abrahub_provider::generate::generate_with_retry;

use crate::signal::QueueSignal;

/// Backstop poll interval; the signal path is the fast path.
const POLL_INTERVAL: Duration = Duration::from_secs(10);

pub struct QueueProcessor {
    pool: PgPool,
    provider: Arc<ProviderClient>,
    signal: Arc<QueueSignal>,
    image_root: PathBuf,
    retry: RetryConfig,
}

impl QueueProcessor {
    pub fn new(
        pool: PgPool,
        provider: Arc<ProviderClient>,
        signal: Arc<QueueSignal>,
        image_root: PathBuf,
    ) -> Self {
        Self {
            pool,
            provider,
            signal,
            image_root,
            retry: RetryConfig::default(),
        }
    }

    /// Run the processor loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        tracing::info!("Queue processor started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Queue processor shutting down");
                    break;
                }
                _ = self.signal.notified() => {
                    self.drain(&cancel).await;
                }
                _ = ticker.tick() => {
                    self.drain(&cancel).await;
                }
            }
        }
    }

    /// Claim and process jobs until the queue is empty or shutdown begins.
    async fn drain(&self, cancel: &CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                return;
            }

            let job = match GenerationJobRepo::claim_next(&self.pool).await {
                Ok(Some(job)) => job,
                Ok(None) => return,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to claim next job");
                    return;
                }
            };

            tracing::info!(job_id = job.id, account_id = job.account_id, "Job claimed");

            if let Err(e) = self.process(&job, cancel).await {
                tracing::error!(job_id = job.id, error = %e, "Job processing failed");
                match GenerationJobRepo::fail(&self.pool, job.id, &e.to_string()).await {
                    Ok(false) => {
                        // Cancelled while processing; nothing left to update.
                        tracing::info!(job_id = job.id, "Job gone before failure recorded");
                    }
                    Ok(true) => {}
                    Err(db_err) => {
                        tracing::error!(job_id = job.id, error = %db_err, "Failed to record job failure");
                    }
                }
            }
        }
    }

    /// One job end to end: generate, download, persist renditions, finalize.
    async fn process(
        &self,
        job: &GenerationJob,
        cancel: &CancellationToken,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let request = build_request(job);

        let result = generate_with_retry(&self.provider, &request, &self.retry, cancel).await?;
        let bytes = self.provider.download(&result.image_url).await?;

        let image = GeneratedImageRepo::insert(
            &self.pool,
            &CreateGeneratedImage {
                account_id: job.account_id,
                prompt: job.prompt.clone(),
                model_label: self.provider.model_label().to_string(),
                base_path: None,
                preview_path: None,
                master_path: None,
                upscaled_path: None,
            },
        )
        .await?;

        let dir = image_dir(&self.image_root, job.account_id, image.id);
        tokio::fs::create_dir_all(&dir).await?;
        let base = rendition_path(&self.image_root, job.account_id, image.id, Rendition::Base);
        tokio::fs::write(&base, &bytes).await?;

        GeneratedImageRepo::set_paths(&self.pool, image.id, &base.to_string_lossy(), None)
            .await?;

        let completed = GenerationJobRepo::complete(&self.pool, job.id, image.id).await?;
        if !completed {
            // The owner cancelled while we were generating. Discard the
            // orphaned result so nothing lingers past the cancellation.
            tracing::info!(job_id = job.id, image_id = image.id, "Job cancelled mid-flight, discarding result");
            GeneratedImageRepo::delete(&self.pool, image.id).await?;
            if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                tracing::warn!(image_id = image.id, error = %e, "Failed to remove discarded renditions");
            }
            return Ok(());
        }

        tracing::info!(job_id = job.id, image_id = image.id, "Job completed");
        Ok(())
    }
}

fn build_request(job: &GenerationJob) -> GenerationRequest {
    let reference_images: Vec<String> =
        serde_json::from_value(job.reference_images.clone()).unwrap_or_default();

    GenerationRequest {
        prompt: job.prompt.clone(),
        aspect_ratio: job.aspect_ratio.clone(),
        quality: job.quality.clone(),
        preset_id: job.preset_id.clone(),
        focal_length: job.focal_length.clone(),
        aperture: job.aperture.clone(),
        camera_angle: job.camera_angle.clone(),
        film_look: job.film_look.clone(),
        reference_images,
        reference_type: job.reference_type.clone(),
    }
}
