//! Retry wrapper around [`ProviderClient::generate`].
//!
//! Transient failures back off exponentially up to the configured attempt
//! bound; fatal failures return immediately. Cancellation aborts between
//! attempts, never mid-request.

use tokio_util::sync::CancellationToken;

use abrahub_core::retry::RetryConfig;

use crate::client::{GenerationRequest, GenerationResult, ProviderClient, ProviderError};

/// Run a generation with bounded exponential-backoff retries.
///
/// Returns the last error when the attempt budget is exhausted, the error
/// itself when it is fatal, or `Err` wrapping a cancellation-free
/// `ProviderError` — the caller records it on the job row either way.
pub async fn generate_with_retry(
    client: &ProviderClient,
    request: &GenerationRequest,
    config: &RetryConfig,
    cancel: &CancellationToken,
) -> Result<GenerationResult, ProviderError> {
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match client.generate(request).await {
            Ok(result) => return Ok(result),
            Err(err) if err.is_transient() => {
                let Some(delay) = config.delay_after(attempt) else {
                    tracing::warn!(attempt, error = %err, "Provider retries exhausted");
                    return Err(err);
                };

                tracing::info!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient provider error, backing off",
                );

                tokio::select! {
                    _ = cancel.cancelled() => return Err(err),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(err) => {
                tracing::warn!(attempt, error = %err, "Fatal provider error, not retrying");
                return Err(err);
            }
        }
    }
}
