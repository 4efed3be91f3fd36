//! Repository for the `generated_images` table.

use sqlx::PgPool;

use abrahub_core::types::{DbId, Timestamp};

use crate::models::generated_image::{CreateGeneratedImage, GeneratedImage};

const COLUMNS: &str = "\
    id, account_id, prompt, model_label, status, base_path, preview_path, \
    master_path, upscaled_path, created_at";

pub struct GeneratedImageRepo;

impl GeneratedImageRepo {
    /// Record a freshly generated image. Called by the processor on
    /// success, before the job is marked completed.
    pub async fn insert(
        pool: &PgPool,
        input: &CreateGeneratedImage,
    ) -> Result<GeneratedImage, sqlx::Error> {
        let query = format!(
            "INSERT INTO generated_images \
                 (account_id, prompt, model_label, base_path, preview_path, \
                  master_path, upscaled_path) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedImage>(&query)
            .bind(input.account_id)
            .bind(&input.prompt)
            .bind(&input.model_label)
            .bind(&input.base_path)
            .bind(&input.preview_path)
            .bind(&input.master_path)
            .bind(&input.upscaled_path)
            .fetch_one(pool)
            .await
    }

    /// Attach rendition paths once the files are on disk. The row id is
    /// part of the path, so this always runs after [`Self::insert`].
    pub async fn set_paths(
        pool: &PgPool,
        id: DbId,
        base_path: &str,
        preview_path: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE generated_images \
             SET base_path = $2, preview_path = $3 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(base_path)
        .bind(preview_path)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<GeneratedImage>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generated_images WHERE id = $1");
        sqlx::query_as::<_, GeneratedImage>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Images past the retention window, oldest first. The caller deletes
    /// the backing files before removing each row.
    pub async fn expired(
        pool: &PgPool,
        cutoff: Timestamp,
        limit: i64,
    ) -> Result<Vec<GeneratedImage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generated_images \
             WHERE created_at < $1 \
             ORDER BY created_at ASC \
             LIMIT $2"
        );
        sqlx::query_as::<_, GeneratedImage>(&query)
            .bind(cutoff)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM generated_images WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
