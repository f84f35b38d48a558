//! HTTP API server for event registration.
//!
//! Provides REST endpoints for categories, events and bookings, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use domain::{Clock, Geocoder, RegistrationServices};
use metrics_exporter_prometheus::PrometheusHandle;
use projections::EventQueries;
use store::RegistrationStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: RegistrationStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/categories",
            get(routes::categories::list::<S>).post(routes::categories::create::<S>),
        )
        .route(
            "/events",
            get(routes::events::list::<S>).post(routes::events::create::<S>),
        )
        .route("/events/created", get(routes::events::created::<S>))
        .route("/events/registered", get(routes::events::registered::<S>))
        .route(
            "/events/{id}",
            get(routes::events::get::<S>).patch(routes::events::update::<S>),
        )
        .route(
            "/events/{id}/bookings",
            get(routes::bookings::attendees::<S>).post(routes::bookings::register::<S>),
        )
        .route(
            "/events/{id}/registration",
            get(routes::bookings::status::<S>),
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

/// Wires every registration component and the listing queries over `store`.
pub fn create_state<S: RegistrationStore + Clone + 'static>(
    store: S,
    geocoder: Arc<dyn Geocoder>,
    clock: Arc<dyn Clock>,
) -> Arc<AppState<S>> {
    let queries = EventQueries::new(store.clone(), clock.clone());
    let services = RegistrationServices::new(store, geocoder, clock);

    Arc::new(AppState { services, queries })
}
