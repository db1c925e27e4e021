//! HTTP API server with observability for the delivery service.
//!
//! A thin adapter over [`coordinator::DeliveryCoordinator`]: handlers map
//! requests onto coordinator operations and coordinator error kinds onto
//! status codes. Structured logging uses tracing and metrics are exported
//! for Prometheus.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use delivery_cache::CacheBackend;
use delivery_store::DeliveryStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::deliveries::{self, AppState};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, B>(state: Arc<AppState<S, B>>, metrics_handle: PrometheusHandle) -> Router
where
    S: DeliveryStore + 'static,
    B: CacheBackend + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/deliveries",
            get(deliveries::list::<S, B>).post(deliveries::create::<S, B>),
        )
        .route(
            "/deliveries/{id}",
            get(deliveries::get::<S, B>).put(deliveries::update::<S, B>),
        )
        .route("/track/{tracking_number}", get(deliveries::track::<S, B>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
