//! Dreams - a messaging backend for channels and direct messages
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Auth, channel, DM, message, user and admin endpoints     │
//! │  - Bearer token sessions                                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Identity, membership, messages                           │
//! │  - Notifications and statistics (derived at read time)      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - In-process social graph behind one RwLock                │
//! │  - JSON snapshots and profile images on local disk          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `service`: Business rules and permission checks
//! - `data`: The graph and its lock
//! - `storage`: Snapshot and media files
//! - `auth`: Passwords, sessions, password reset delivery
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;
pub mod storage;

use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// The social graph
    pub store: Arc<data::Store>,

    /// Live sessions
    pub sessions: Arc<auth::SessionRegistry>,

    /// Snapshot file, when persistence is enabled
    pub snapshots: Option<Arc<storage::SnapshotStore>>,

    /// Profile image storage
    pub media: Arc<storage::MediaStore>,

    /// Runs delayed sends
    pub timer: Arc<dyn service::DeliveryTimer>,

    /// Delivers password reset codes
    pub mailer: Arc<dyn auth::ResetMailer>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Restore the graph from the last snapshot, if persistence is enabled
    /// 2. Set up sessions, media storage and the delivery timer
    ///
    /// # Errors
    /// Returns error if the snapshot cannot be read or the HTTP client cannot be built
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let (store, snapshots) = if config.persistence.enabled {
            let snapshots = storage::SnapshotStore::new(&config.persistence.path);
            let graph = snapshots.load()?;
            (data::Store::new(graph), Some(Arc::new(snapshots)))
        } else {
            (data::Store::default(), None)
        };
        let store = Arc::new(store);
        metrics::observe_graph(&store.read());

        let sessions =
            auth::SessionRegistry::new(&config.auth.session_secret, config.auth.session_max_age);
        let media = storage::MediaStore::new(&config.media, &config.server)?;
        let timer = service::TokioTimer::new(store.clone());

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            store,
            sessions: Arc::new(sessions),
            snapshots,
            media: Arc::new(media),
            timer: Arc::new(timer),
            mailer: Arc::new(auth::LogMailer),
        })
    }

    pub fn identity(&self) -> service::IdentityService {
        service::IdentityService::new(self.store.clone())
    }

    pub fn membership(&self) -> service::MembershipService {
        service::MembershipService::new(self.store.clone())
    }

    pub fn messages(&self) -> service::MessageService {
        service::MessageService::new(self.store.clone())
    }

    pub fn notifications(&self) -> service::NotificationService {
        service::NotificationService::new(self.store.clone())
    }

    pub fn stats(&self) -> service::StatsService {
        service::StatsService::new(self.store.clone())
    }

    /// Write a snapshot now; a no-op when persistence is disabled
    pub async fn save_snapshot(&self) -> Result<(), error::AppError> {
        let Some(snapshots) = self.snapshots.clone() else {
            return Ok(());
        };
        let graph = self.store.snapshot();
        tokio::task::spawn_blocking(move || snapshots.save(&graph))
            .await
            .map_err(|e| error::AppError::Internal(e.into()))?
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{
        compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
    };

    let static_files = ServeDir::new(&state.config.media.directory);

    let mut routes = api::dreams_router();
    if state.config.server.enable_clear {
        tracing::warn!("DELETE /clear/v1 is enabled; any client can wipe all data");
        routes = routes.merge(api::clear_router());
    }

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(routes)
        .nest_service("/static", static_files)
        .layer(axum::middleware::from_fn(api::metrics::track_requests))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
