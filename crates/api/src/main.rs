//! API server entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use api::routes::deliveries::AppState;
use coordinator::DeliveryCoordinator;
use delivery_cache::{DeliveryCache, RedisCacheBackend};
use delivery_store::PostgresDeliveryStore;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env().expect("invalid configuration");
    init_tracing(config.log_format);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Open the store and the cache
    tracing::info!(database = ?config.database, redis = ?config.redis, "opening resources");
    let store = PostgresDeliveryStore::connect(&config.database)
        .await
        .expect("failed to connect to PostgreSQL");
    if config.run_migrations {
        store
            .run_migrations()
            .await
            .expect("failed to run migrations");
    }
    let cache_backend = RedisCacheBackend::connect(&config.redis)
        .await
        .expect("failed to connect to Redis");

    // 4. Build the application
    let coordinator = DeliveryCoordinator::new(
        store.clone(),
        DeliveryCache::new(cache_backend.clone(), config.cache_ttl),
        config.coordinator,
    );
    let app = api::create_app(Arc::new(AppState::new(coordinator)), metrics_handle);

    // 5. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // 6. Release resources. `serve` consumed the router, so these are the
    //    last handles to the pool and the Redis connection.
    store.close().await;
    cache_backend.close();
    tracing::info!("server shut down gracefully");
}
