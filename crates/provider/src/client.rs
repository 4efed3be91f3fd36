//! REST client for the model provider's generation endpoint.

use serde::{Deserialize, Serialize};

/// HTTP client for the image-generation model API.
pub struct ProviderClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    /// Model label recorded on every generated image.
    model_label: String,
}

/// Generation request sent to the provider.
///
/// Camera/lens preset keys are passed through verbatim; the provider owns
/// their interpretation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focal_length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aperture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_angle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub film_look: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub reference_images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_type: Option<String>,
}

/// Successful generation response.
#[derive(Debug, Deserialize)]
pub struct GenerationResult {
    /// URL the finished artifact can be downloaded from.
    pub image_url: String,
}

/// Errors from the provider API layer.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Provider API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl ProviderError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Rate limits (429), server-side failures (5xx), and transport errors
    /// are transient; any other API rejection (invalid prompt, policy
    /// violation) is fatal.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Request(e) => !e.is_builder(),
            ProviderError::Api { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

impl ProviderClient {
    pub fn new(api_url: String, api_key: String, model_label: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            model_label,
        }
    }

    pub fn model_label(&self) -> &str {
        &self.model_label
    }

    /// Submit one generation request and wait for the result.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, ProviderError> {
        let response = self
            .client
            .post(format!("{}/v1/images/generate", self.api_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<GenerationResult>().await?)
    }

    /// Download the finished artifact bytes.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_and_server_errors_are_transient() {
        for status in [429u16, 500, 502, 503] {
            let err = ProviderError::Api {
                status,
                body: String::new(),
            };
            assert!(err.is_transient(), "status {status} should be transient");
        }
    }

    #[test]
    fn client_rejections_are_fatal() {
        for status in [400u16, 403, 422] {
            let err = ProviderError::Api {
                status,
                body: "policy violation".into(),
            };
            assert!(!err.is_transient(), "status {status} should be fatal");
        }
    }
}
