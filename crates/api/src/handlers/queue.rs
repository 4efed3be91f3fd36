//! Handlers for the `/queue` resource: admission, status, cancellation.
//!
//! All endpoints require authentication. Position and ETA are recomputed on
//! every call — queue order shifts as other jobs complete, so caching them
//! would report stale waits.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use abrahub_core::error::CoreError;
use abrahub_core::reference::{resolve_reference_type, validate_prompt};
use abrahub_core::types::DbId;
use abrahub_db::models::generated_image::GeneratedImage;
use abrahub_db::models::generation_job::{GenerationJob, QueueStats, SubmitGenerationJob};
use abrahub_db::models::status::JobStatus;
use abrahub_db::repositories::{CreditRepo, GeneratedImageRepo, GenerationJobRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Fallback per-job estimate when no completion sample exists today.
const DEFAULT_JOB_SECS: f64 = 15.0;

/// Informational credit cost attached to each admission. Actual spending
/// goes through the ledger when metering is enabled.
const GENERATION_COST: i64 = 1;

#[derive(Debug, Serialize)]
pub struct AdmitResponse {
    pub success: bool,
    pub queue_id: DbId,
    pub status: &'static str,
    pub position: i64,
    pub estimated_wait_seconds: i64,
    pub credits_cost: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub queue_id: DbId,
    pub status: &'static str,
    pub position: i64,
    pub estimated_wait_seconds: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<GeneratedImage>,
}

#[derive(Debug, Serialize)]
pub struct QueueOverviewResponse {
    pub user_items: Vec<GenerationJob>,
    pub global_stats: QueueStats,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub success: bool,
    pub message: &'static str,
}

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

/// POST /api/v1/queue
///
/// Admit a generation request. The job is persisted in `queued` status and
/// the processor is nudged; the HTTP response returns immediately so
/// request latency is decoupled from generation latency. Clients poll
/// `GET /queue/{id}` for progress.
pub async fn admit(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SubmitGenerationJob>,
) -> AppResult<impl IntoResponse> {
    validate_prompt(&input.prompt).map_err(AppError::Core)?;
    super::ensure_not_blocked(&state.pool, auth.user_id).await?;

    if state.config.metering.enabled {
        let balance = CreditRepo::find_wallet(&state.pool, auth.user_id)
            .await?
            .map(|w| w.balance)
            .unwrap_or(0);
        if !state.config.metering.can_spend(balance, GENERATION_COST) {
            return Err(AppError::InsufficientCredits);
        }
    }

    let reference_type = resolve_reference_type(
        input.storyboard6_mode,
        input.sequence_mode,
        input.reference_images.len(),
    );

    let job = GenerationJobRepo::submit(&state.pool, auth.user_id, &input, reference_type).await?;

    // Best-effort nudge; the watchdog is the backstop if the processor
    // misses it.
    state.queue_signal.notify();

    let position = GenerationJobRepo::position(&state.pool, job.id).await?;
    let stats = GenerationJobRepo::queue_stats(&state.pool).await?;

    tracing::info!(
        job_id = job.id,
        account_id = auth.user_id,
        reference_type = reference_type.unwrap_or("none"),
        position,
        "Generation job admitted",
    );

    Ok((
        StatusCode::CREATED,
        Json(AdmitResponse {
            success: true,
            queue_id: job.id,
            status: JobStatus::Queued.as_str(),
            position,
            estimated_wait_seconds: estimate_wait(position, stats.avg_processing_secs),
            credits_cost: job.credits_cost,
            message: "Request queued".into(),
        }),
    ))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/v1/queue/{id}
///
/// Status of one job, scoped to its owner. Completed jobs embed the
/// resolved image record.
pub async fn job_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = GenerationJobRepo::find_for_account(&state.pool, job_id, auth.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "GenerationJob",
            id: job_id,
        }))?;

    let status = JobStatus::from_id(job.status_id);
    let position = match status {
        JobStatus::Queued => GenerationJobRepo::position(&state.pool, job.id).await?,
        _ => 0,
    };

    let estimated_wait_seconds = if status == JobStatus::Queued {
        let stats = GenerationJobRepo::queue_stats(&state.pool).await?;
        estimate_wait(position, stats.avg_processing_secs)
    } else {
        0
    };

    let image = match (status, job.result_image_id) {
        (JobStatus::Completed, Some(image_id)) => {
            GeneratedImageRepo::find_by_id(&state.pool, image_id).await?
        }
        _ => None,
    };

    Ok(Json(DataResponse {
        data: JobStatusResponse {
            queue_id: job.id,
            status: status.as_str(),
            position,
            estimated_wait_seconds,
            error_message: job.error_message,
            image,
        },
    }))
}

/// GET /api/v1/queue
///
/// The caller's active jobs plus global queue statistics.
pub async fn overview(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let user_items = GenerationJobRepo::active_for_account(&state.pool, auth.user_id).await?;
    let global_stats = GenerationJobRepo::queue_stats(&state.pool).await?;

    Ok(Json(DataResponse {
        data: QueueOverviewResponse {
            user_items,
            global_stats,
        },
    }))
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// DELETE /api/v1/queue/{id}
///
/// Idempotent owner-scoped cancellation. Canceling a job that does not
/// exist, was already canceled, or belongs to another account succeeds
/// with nothing removed — cancellation is a delete, not a state-machine
/// transition, so replays have no additional effect.
pub async fn cancel(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let deleted = GenerationJobRepo::cancel_delete(&state.pool, job_id, auth.user_id).await?;

    if deleted > 0 {
        tracing::info!(job_id, account_id = auth.user_id, "Generation job canceled");
    }

    Ok(Json(CancelResponse {
        success: true,
        message: if deleted > 0 {
            "Job canceled"
        } else {
            "Nothing to cancel"
        },
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `(position - 1) * avg_per_job_secs`, with the fixed fallback estimate
/// when today has no completion sample. Position 0 (not queued) estimates 0.
fn estimate_wait(position: i64, avg_processing_secs: Option<f64>) -> i64 {
    if position <= 0 {
        return 0;
    }
    let per_job = avg_processing_secs.unwrap_or(DEFAULT_JOB_SECS);
    ((position - 1) as f64 * per_job).round() as i64
}
