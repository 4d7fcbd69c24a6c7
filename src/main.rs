//! Dreams binary entry point

use dreams::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Initialize tracing/logging
/// 2. Load configuration from file and environment
/// 3. Initialize AppState (restores the last snapshot)
/// 4. Build Axum router
/// 5. Start background tasks (snapshot scheduler)
/// 6. Serve until Ctrl-C, then write a final snapshot
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize tracing/logging
    let log_format =
        std::env::var("DREAMS__LOGGING__FORMAT").unwrap_or_else(|_| "pretty".to_string());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "dreams=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "dreams=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting Dreams...");

    // 2. Initialize metrics
    dreams::metrics::init_metrics();

    // 3. Load configuration
    let config = config::AppConfig::load()?;
    tracing::info!(
        public_url = %config.server.base_url(),
        persistence = config.persistence.enabled,
        "Configuration loaded"
    );

    // 4. Initialize application state
    let state = AppState::new(config.clone()).await?;

    // 5. Build Axum router
    let app = dreams::build_router(state.clone());

    // 6. Start HTTP server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    // 7. Start background tasks
    if config.persistence.enabled {
        spawn_snapshot_task(state.clone());
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down, writing final snapshot...");
    state.save_snapshot().await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal");
    }
}

/// Spawn background snapshot task
fn spawn_snapshot_task(state: AppState) {
    tokio::spawn(async move {
        let interval_secs = state.config.persistence.interval_seconds;
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

        // The first tick fires immediately; the graph was just restored.
        interval.tick().await;

        loop {
            interval.tick().await;

            match state.save_snapshot().await {
                Ok(()) => tracing::debug!("Scheduled snapshot completed"),
                Err(e) => tracing::error!(error = %e, "Scheduled snapshot failed"),
            }
        }
    });

    tracing::info!("Snapshot task spawned");
}
