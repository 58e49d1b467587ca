//! Operator endpoints: status transitions and channel diagnostics.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use chrono::NaiveDate;
use common::{Channel, RoomId};
use engine::{ChannelSync, SyncStep, TransitionOutcome};
use inventory_store::InventoryStore;
use serde::{Deserialize, Serialize};

use super::reservations::ReservationResponse;
use super::{AppState, parse_reservation_id};
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize, Default)]
pub struct ConfirmRequest {
    pub push_to_channel: Option<String>,
}

#[derive(Deserialize)]
pub struct AvailabilityRequest {
    pub room_id: i64,
    pub date: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct TransitionResponse {
    pub success: bool,
    pub data: ReservationResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_sync: Option<ChannelSync>,
}

impl From<TransitionOutcome> for TransitionResponse {
    fn from(outcome: TransitionOutcome) -> Self {
        Self {
            success: true,
            data: ReservationResponse::from(&outcome.reservation),
            channel_sync: outcome.channel_sync,
        }
    }
}

#[derive(Serialize)]
pub struct DiagnosticsResponse {
    pub success: bool,
    pub steps: Vec<SyncStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_failed: Option<String>,
}

// -- Handlers --

/// POST /admin/reservations/{id}/confirm — confirm, optionally pushing to a channel.
///
/// The body is optional: `{"push_to_channel": "beds24"}`.
#[tracing::instrument(skip(state, body))]
pub async fn confirm<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<TransitionResponse>, ApiError> {
    let id = parse_reservation_id(&id)?;
    let request: ConfirmRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ConfirmRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))?
    };
    let push_to_channel = request
        .push_to_channel
        .map(|c| c.parse::<Channel>())
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let outcome = state.reservations.confirm(id, push_to_channel).await?;
    Ok(Json(outcome.into()))
}

/// POST /admin/reservations/{id}/check-in
#[tracing::instrument(skip(state))]
pub async fn check_in<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let id = parse_reservation_id(&id)?;
    Ok(Json(state.reservations.check_in(id).await?.into()))
}

/// POST /admin/reservations/{id}/check-out
#[tracing::instrument(skip(state))]
pub async fn check_out<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let id = parse_reservation_id(&id)?;
    Ok(Json(state.reservations.check_out(id).await?.into()))
}

/// POST /admin/reservations/{id}/complete
#[tracing::instrument(skip(state))]
pub async fn complete<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let id = parse_reservation_id(&id)?;
    Ok(Json(state.reservations.complete(id).await?.into()))
}

/// POST /admin/reservations/{id}/cancel
#[tracing::instrument(skip(state))]
pub async fn cancel<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let id = parse_reservation_id(&id)?;
    Ok(Json(state.reservations.cancel(id).await?.into()))
}

/// POST /admin/diagnostics/availability — push one room-night to its channels.
#[tracing::instrument(skip_all)]
pub async fn availability<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<AvailabilityRequest>, JsonRejection>,
) -> Result<Json<DiagnosticsResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let date = match request.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| ApiError::BadRequest("date must be in YYYY-MM-DD format".to_string()))?,
        None => state.clock.today(),
    };

    let report = state
        .availability
        .push_room(RoomId::new(request.room_id), date)
        .await;
    Ok(Json(DiagnosticsResponse {
        success: report.is_success(),
        steps: report.steps,
        step_failed: report.step_failed,
    }))
}
