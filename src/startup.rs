//! Application Startup
//!
//! Backend selection, service wiring and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;

use crate::application::services::Services;
use crate::config::{PresenceBackend, Settings, StorageBackend};
use crate::domain::{BlobStore, IdentityProvider, Repositories};
use crate::infrastructure::blob::LocalBlobStore;
use crate::infrastructure::cache::{self, RedisConnectionRepository};
use crate::infrastructure::database::{self, DocumentStore};
use crate::infrastructure::identity::JwtIdentityProvider;
use crate::infrastructure::memory::InMemoryStore;
use crate::infrastructure::repositories::postgres_repositories;
use crate::presentation::http::routes;
use crate::presentation::middleware::{cors, logging};
use crate::presentation::websocket::Gateway;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub gateway: Arc<Gateway>,
    pub settings: Arc<Settings>,
    /// Present when documents live in PostgreSQL
    pub database: Option<DocumentStore>,
    /// Present when the connection registry lives in Redis
    pub presence_store: Option<RedisConnectionRepository>,
}

impl AppState {
    /// Wire services over `repos` with the gateway as fan-out transport.
    pub fn new(
        settings: Settings,
        repos: &Repositories,
        identity: Arc<dyn IdentityProvider>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        let gateway = Arc::new(Gateway::new(settings.websocket.heartbeat_interval_ms));
        let services = Services::new(repos, identity, blobs, gateway.clone());

        Self {
            services,
            gateway,
            settings: Arc::new(settings),
            database: None,
            presence_store: None,
        }
    }

    /// Connect the configured backends and build the state.
    pub async fn from_settings(settings: Settings) -> Result<Self> {
        let memory = Arc::new(InMemoryStore::default());
        let mut repos = memory.repositories();
        let mut database = None;
        let mut presence_store = None;

        match settings.storage.backend {
            StorageBackend::Postgres => {
                let pool = database::create_pool(&settings.database).await?;
                if settings.database.run_migrations {
                    database::run_migrations(&pool).await?;
                    tracing::info!("Database migrations applied");
                }
                let store = DocumentStore::new(pool);
                repos = postgres_repositories(store.clone(), repos.connections.clone());
                database = Some(store);
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory document storage; data is lost on restart");
            }
        }

        match settings.presence.backend {
            PresenceBackend::Redis => {
                let redis = cache::create_redis_client(&settings.redis).await?;
                let registry = RedisConnectionRepository::new(redis);
                repos.connections = Arc::new(registry.clone());
                presence_store = Some(registry);
            }
            PresenceBackend::Memory => {
                tracing::warn!("Using in-memory connection registry; presence is per process");
            }
        }

        let identity: Arc<dyn IdentityProvider> = Arc::new(JwtIdentityProvider::new(
            settings.jwt.clone(),
            settings.identity.clone(),
        ));
        let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(&settings.blob).await?);

        let mut state = Self::new(settings, &repos, identity, blobs);
        state.database = database;
        state.presence_store = presence_store;
        Ok(state)
    }
}

/// Router with the HTTP middleware stack applied
pub fn build_router(state: AppState) -> Router {
    let cors = cors::create_cors_layer(&state.settings.cors);

    routes::create_router(state).layer(
        ServiceBuilder::new()
            .layer(logging::create_trace_layer())
            .layer(cors)
            .layer(CompressionLayer::new()),
    )
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        let addr = settings.server.socket_addr()?;
        let state = AppState::from_settings(settings).await?;
        let router = build_router(state);

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
