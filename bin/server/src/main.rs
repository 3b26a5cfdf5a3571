use flowcanvas_server::{
    AppState,
    config::{ServerConfig, StorageBackend},
    db::PgGraphRepository,
    router,
};
use flowcanvas_store::{GraphRepository, GraphStore, MemoryRepository};
use flowcanvas_workflow::load_definitions;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    // Blueprints are fixed for the life of the process
    let registry = load_definitions(&config.definitions_dir).expect("failed to load node definitions");
    tracing::info!(definitions = registry.len(), "Loaded node definitions");

    let repo: Arc<dyn GraphRepository> = match config.storage.backend {
        StorageBackend::Postgres => {
            let database_url = config
                .storage
                .database_url
                .as_deref()
                .expect("database url is checked when configuration loads");
            let db_pool = PgPoolOptions::new()
                .max_connections(config.storage.max_connections)
                .connect(database_url)
                .await
                .expect("failed to connect to database");

            tracing::info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&db_pool)
                .await
                .expect("failed to run migrations");

            Arc::new(PgGraphRepository::new(db_pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Arc::new(MemoryRepository::new())
        }
    };

    let store = GraphStore::new(repo, Arc::new(registry));
    let app = router(Arc::new(AppState::new(store, config.auth)));

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
