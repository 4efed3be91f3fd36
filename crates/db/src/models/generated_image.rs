//! Generated image entity.

use serde::Serialize;
use sqlx::FromRow;

use abrahub_core::types::{DbId, Timestamp};

/// A row from the `generated_images` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GeneratedImage {
    pub id: DbId,
    pub account_id: DbId,
    pub prompt: String,
    pub model_label: String,
    pub status: String,
    pub base_path: Option<String>,
    pub preview_path: Option<String>,
    pub master_path: Option<String>,
    pub upscaled_path: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for recording a freshly generated image.
#[derive(Debug, Clone)]
pub struct CreateGeneratedImage {
    pub account_id: DbId,
    pub prompt: String,
    pub model_label: String,
    pub base_path: Option<String>,
    pub preview_path: Option<String>,
    pub master_path: Option<String>,
    pub upscaled_path: Option<String>,
}
