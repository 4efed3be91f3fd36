//! Reference-type resolution for generation requests.
//!
//! A request can carry several mode flags at once; the stored
//! `reference_type` tag is resolved by fixed priority so downstream
//! consumers never have to re-derive it.

use crate::error::CoreError;

/// Storyboard-6 mode: a six-panel storyboard built from reference frames.
pub const REFERENCE_STORYBOARD6: &str = "storyboard6";

/// Sequence mode: continuation of a prior shot sequence.
pub const REFERENCE_SEQUENCE: &str = "sequence";

/// Standard reference: plain image conditioning.
pub const REFERENCE_STANDARD: &str = "standard";

/// Resolve the reference-type tag for a request.
///
/// Priority order: storyboard6 > sequence > standard. A request with no
/// reference images and no mode flags has no reference type.
pub fn resolve_reference_type(
    storyboard6_mode: bool,
    sequence_mode: bool,
    reference_image_count: usize,
) -> Option<&'static str> {
    if storyboard6_mode {
        Some(REFERENCE_STORYBOARD6)
    } else if sequence_mode {
        Some(REFERENCE_SEQUENCE)
    } else if reference_image_count > 0 {
        Some(REFERENCE_STANDARD)
    } else {
        None
    }
}

/// Validate an admission prompt. Empty or whitespace-only prompts are
/// rejected before a job row is ever created.
pub fn validate_prompt(prompt: &str) -> Result<(), CoreError> {
    if prompt.trim().is_empty() {
        return Err(CoreError::Validation("Prompt must not be empty".into()));
    }
    Ok(())
}
