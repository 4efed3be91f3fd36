//! On-disk layout for generated image renditions.
//!
//! Each generated image is stored under `<root>/<account_id>/<image_id>/`
//! with one file per rendition. Paths are computed here so the processor
//! (writing) and the retention sweep (deleting) agree on the layout.

use std::path::{Path, PathBuf};

use crate::types::DbId;

/// Retention window for generated images, in days. The retention sweep
/// deletes both the database row and the rendition files after this.
pub const IMAGE_RETENTION_DAYS: i64 = 7;

/// Rendition of a generated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendition {
    /// Full-size output as returned by the model.
    Base,
    /// Downscaled preview for gallery views.
    Preview,
    /// Color-managed master for export.
    Master,
    /// Optional upscaled variant.
    Upscaled,
}

impl Rendition {
    pub fn file_name(self) -> &'static str {
        match self {
            Rendition::Base => "base.png",
            Rendition::Preview => "preview.png",
            Rendition::Master => "master.png",
            Rendition::Upscaled => "upscaled.png",
        }
    }
}

/// Directory holding every rendition of one image.
pub fn image_dir(root: &Path, account_id: DbId, image_id: DbId) -> PathBuf {
    root.join(account_id.to_string()).join(image_id.to_string())
}

/// Full path for one rendition of one image.
pub fn rendition_path(root: &Path, account_id: DbId, image_id: DbId, rendition: Rendition) -> PathBuf {
    image_dir(root, account_id, image_id).join(rendition.file_name())
}
