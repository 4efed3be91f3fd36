//! HTTP client for the external image-generation model API.
//!
//! The queue processor is the only consumer. Errors are split into
//! transient (retried with backoff by [`generate::generate_with_retry`])
//! and fatal (failed immediately) classes.

pub mod client;
pub mod generate;

pub use client::{GenerationRequest, GenerationResult, ProviderClient, ProviderError};
pub use generate::generate_with_retry;
