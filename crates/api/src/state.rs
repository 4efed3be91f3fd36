use std::sync::Arc;

use abrahub_provider::ProviderClient;

use crate::config::ServerConfig;
use crate::signal::QueueSignal;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: abrahub_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Wake-up channel to the queue processor.
    pub queue_signal: Arc<QueueSignal>,
    /// Model provider client.
    pub provider: Arc<ProviderClient>,
}
