//! HTTP API server for the reservation engine.
//!
//! Exposes direct booking, channel webhooks, guest self-service and operator
//! endpoints, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod rate_limit;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use channels::{
    Beds24Adapter, ChannelError, ChannelRegistry, ChannexAdapter, MappingError, RoomChannelMap,
};
use common::Channel;
use inventory_store::InventoryStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: InventoryStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/bookings", post(routes::bookings::create::<S>))
        .route("/webhooks/{channel}", post(routes::webhooks::receive::<S>))
        .route("/reservations", get(routes::reservations::list_by_email::<S>))
        .route(
            "/reservations/cancel",
            post(routes::reservations::cancel_by_token::<S>),
        )
        .route(
            "/reservations/by-token/{token}",
            get(routes::reservations::get_by_token::<S>),
        )
        .route(
            "/admin/reservations/{id}/confirm",
            post(routes::admin::confirm::<S>),
        )
        .route(
            "/admin/reservations/{id}/check-in",
            post(routes::admin::check_in::<S>),
        )
        .route(
            "/admin/reservations/{id}/check-out",
            post(routes::admin::check_out::<S>),
        )
        .route(
            "/admin/reservations/{id}/complete",
            post(routes::admin::complete::<S>),
        )
        .route(
            "/admin/reservations/{id}/cancel",
            post(routes::admin::cancel::<S>),
        )
        .route(
            "/admin/diagnostics/availability",
            post(routes::admin::availability::<S>),
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

/// Registers an adapter for every channel whose credentials are complete.
///
/// Incomplete channels are skipped with an error log naming the channel
/// only; operations that need them later fail as configuration errors.
pub fn channel_registry(config: &Config) -> Result<ChannelRegistry, ChannelError> {
    let mut registry = ChannelRegistry::new();

    if config.beds24.is_complete() {
        registry.register(Arc::new(Beds24Adapter::new(config.beds24.clone())?));
    } else {
        tracing::error!(
            channel = %Channel::Beds24,
            "Channel credentials incomplete, not registering"
        );
    }

    if config.channex.is_complete() {
        registry.register(Arc::new(ChannexAdapter::new(config.channex.clone())?));
    } else {
        tracing::error!(
            channel = %Channel::Channex,
            "Channel credentials incomplete, not registering"
        );
    }

    tracing::info!(channels = ?registry.channels(), "Channel adapters configured");
    Ok(registry)
}

/// Loads the room/channel mapping table; empty when no file is configured.
pub fn room_mappings(config: &Config) -> Result<RoomChannelMap, MappingError> {
    match &config.room_mappings_path {
        Some(path) => {
            let mapping = RoomChannelMap::from_json_file(path)?;
            tracing::info!(
                path = %path.display(),
                mappings = mapping.len(),
                "Room mappings loaded"
            );
            Ok(mapping)
        }
        None => {
            tracing::warn!("ROOM_MAPPINGS_PATH not set, no rooms are synchronized with channels");
            Ok(RoomChannelMap::default())
        }
    }
}
