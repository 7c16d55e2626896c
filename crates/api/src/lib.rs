//! HTTP boundary for the fulfillment service.
//!
//! Exposes the provider webhook endpoint and the operator inventory
//! routes, with structured logging (tracing) and Prometheus metrics.
//! All services are constructed at startup and injected; there is no
//! process-wide state beyond the storage connection pool.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use fulfillment::{FulfillmentOrchestrator, NotificationPort};
use metrics_exporter_prometheus::PrometheusHandle;
use store::FulfillmentStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use webhook::EventVerifier;

pub use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S: FulfillmentStore, N: NotificationPort> {
    pub orchestrator: FulfillmentOrchestrator<S, N>,
    pub store: S,
}

/// Wires the orchestrator and its collaborators from configuration.
pub fn create_state<S, N>(store: S, notifier: N, config: &Config) -> Arc<AppState<S, N>>
where
    S: FulfillmentStore + Clone + 'static,
    N: NotificationPort + 'static,
{
    let verifier = EventVerifier::new(config.webhook_secret.clone());
    let orchestrator = FulfillmentOrchestrator::new(
        verifier,
        store.clone(),
        notifier,
        config.category_policy(),
        config.validity(),
    );
    Arc::new(AppState {
        orchestrator,
        store,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, N>(state: Arc<AppState<S, N>>, metrics_handle: PrometheusHandle) -> Router
where
    S: FulfillmentStore + Clone + 'static,
    N: NotificationPort + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/webhooks/payment", post(routes::webhook::receive::<S, N>))
        .route("/admin/inventory", post(routes::admin::restock::<S, N>))
        .route("/admin/inventory", get(routes::admin::levels::<S, N>))
        .route("/admin/inventory/sweep", post(routes::admin::sweep::<S, N>))
        .route(
            "/admin/inventory/{id}/release",
            post(routes::admin::release::<S, N>),
        )
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
