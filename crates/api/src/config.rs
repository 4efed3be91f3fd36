use std::path::PathBuf;

use abrahub_core::plan::MeteringPolicy;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the secrets have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
    /// Base URL of the image-generation model API.
    pub provider_url: String,
    /// API key for the model provider.
    pub provider_api_key: String,
    /// Model label recorded on generated images (default: `abra-cinema-v1`).
    pub provider_model_label: String,
    /// Root directory for generated image renditions
    /// (default: `./data/images`).
    pub image_root: PathBuf,
    /// Signing secret for Stripe webhooks.
    pub stripe_webhook_secret: String,
    /// Base URL of the Stripe REST API (overridable for tests).
    pub stripe_api_url: String,
    /// Secret key for pull-model subscription lookups. Empty disables
    /// the lookup; the stored entitlement is served as-is.
    pub stripe_api_key: String,
    /// Signing secret for Kiwify webhooks.
    pub kiwify_webhook_secret: String,
    /// Whether admission consults the credit wallet (default: `false`).
    pub metering: MeteringPolicy,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Required | Default                 |
    /// |--------------------------|----------|-------------------------|
    /// | `HOST`                   | no       | `0.0.0.0`               |
    /// | `PORT`                   | no       | `3000`                  |
    /// | `CORS_ORIGINS`           | no       | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`   | no       | `30`                    |
    /// | `JWT_SECRET`             | **yes**  | --                      |
    /// | `PROVIDER_URL`           | no       | `http://localhost:8787` |
    /// | `PROVIDER_API_KEY`       | no       | empty                   |
    /// | `PROVIDER_MODEL_LABEL`   | no       | `abra-cinema-v1`        |
    /// | `IMAGE_ROOT`             | no       | `./data/images`         |
    /// | `STRIPE_WEBHOOK_SECRET`  | no       | empty (verification off)|
    /// | `STRIPE_API_URL`         | no       | `https://api.stripe.com`|
    /// | `STRIPE_API_KEY`         | no       | empty (lookup off)      |
    /// | `KIWIFY_WEBHOOK_SECRET`  | no       | empty (verification off)|
    /// | `METERING_ENABLED`       | no       | `false`                 |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let metering_enabled: bool = std::env::var("METERING_ENABLED")
            .unwrap_or_else(|_| "false".into())
            .parse()
            .expect("METERING_ENABLED must be true or false");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            provider_url: std::env::var("PROVIDER_URL")
                .unwrap_or_else(|_| "http://localhost:8787".into()),
            provider_api_key: std::env::var("PROVIDER_API_KEY").unwrap_or_default(),
            provider_model_label: std::env::var("PROVIDER_MODEL_LABEL")
                .unwrap_or_else(|_| "abra-cinema-v1".into()),
            image_root: std::env::var("IMAGE_ROOT")
                .unwrap_or_else(|_| "./data/images".into())
                .into(),
            stripe_webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            stripe_api_url: std::env::var("STRIPE_API_URL")
                .unwrap_or_else(|_| "https://api.stripe.com".into()),
            stripe_api_key: std::env::var("STRIPE_API_KEY").unwrap_or_default(),
            kiwify_webhook_secret: std::env::var("KIWIFY_WEBHOOK_SECRET").unwrap_or_default(),
            metering: MeteringPolicy {
                enabled: metering_enabled,
            },
        }
    }
}
