use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use abrahub_api::config::ServerConfig;
use abrahub_api::engine::QueueProcessor;
use abrahub_api::router::build_app_router;
use abrahub_api::signal::QueueSignal;
use abrahub_api::state::AppState;
use abrahub_api::background;
use abrahub_provider::ProviderClient;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "abrahub_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = abrahub_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    abrahub_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    abrahub_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Queue signal + provider client ---
    let queue_signal = Arc::new(QueueSignal::new());
    let provider = Arc::new(ProviderClient::new(
        config.provider_url.clone(),
        config.provider_api_key.clone(),
        config.provider_model_label.clone(),
    ));

    // --- Background tasks ---
    let cancel = CancellationToken::new();

    let processor = QueueProcessor::new(
        pool.clone(),
        Arc::clone(&provider),
        Arc::clone(&queue_signal),
        config.image_root.clone(),
    );
    let processor_cancel = cancel.clone();
    let processor_handle = tokio::spawn(async move {
        processor.run(processor_cancel).await;
    });

    let watchdog_handle = tokio::spawn(background::queue_watchdog::run(
        pool.clone(),
        Arc::clone(&queue_signal),
        cancel.clone(),
    ));
    let grace_handle = tokio::spawn(background::grace_expiry::run(pool.clone(), cancel.clone()));
    let retention_handle = tokio::spawn(background::retention::run(
        pool.clone(),
        config.image_root.clone(),
        cancel.clone(),
    ));

    tracing::info!("Background tasks started (processor, watchdog, grace expiry, retention)");

    // --- App state + router ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        queue_signal: Arc::clone(&queue_signal),
        provider: Arc::clone(&provider),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    for (name, handle) in [
        ("queue processor", processor_handle),
        ("queue watchdog", watchdog_handle),
        ("grace expiry", grace_handle),
        ("retention", retention_handle),
    ] {
        if tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .is_err()
        {
            tracing::warn!(task = name, "Background task did not stop in time");
        }
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
