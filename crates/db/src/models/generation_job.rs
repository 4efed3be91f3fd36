//! Generation job entity and DTOs for the queue.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use abrahub_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `generation_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GenerationJob {
    pub id: DbId,
    pub account_id: DbId,
    pub status_id: StatusId,
    pub prompt: String,
    pub aspect_ratio: Option<String>,
    pub quality: Option<String>,
    pub preset_id: Option<String>,
    pub focal_length: Option<String>,
    pub aperture: Option<String>,
    pub camera_angle: Option<String>,
    pub film_look: Option<String>,
    pub reference_images: serde_json::Value,
    pub reference_type: Option<String>,
    pub use_own_key: bool,
    pub credits_cost: i64,
    pub result_image_id: Option<DbId>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

/// DTO for admitting a new generation job.
///
/// `reference_type` is resolved from the mode flags before insertion; the
/// raw flags themselves are not persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitGenerationJob {
    pub prompt: String,
    pub aspect_ratio: Option<String>,
    pub quality: Option<String>,
    pub preset_id: Option<String>,
    pub focal_length: Option<String>,
    pub aperture: Option<String>,
    pub camera_angle: Option<String>,
    pub film_look: Option<String>,
    #[serde(default)]
    pub reference_images: Vec<String>,
    #[serde(default)]
    pub use_own_key: bool,
    #[serde(default)]
    pub sequence_mode: bool,
    #[serde(default)]
    pub storyboard6_mode: bool,
}

/// Aggregate queue statistics for the introspection endpoint.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueueStats {
    pub queued: i64,
    pub processing: i64,
    pub completed_today: i64,
    /// Average seconds from `started_at` to `completed_at` for jobs
    /// completed today. `None` when no sample exists.
    pub avg_processing_secs: Option<f64>,
}
