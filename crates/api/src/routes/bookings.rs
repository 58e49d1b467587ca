//! Direct booking endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use domain::BookingRequest;
use inventory_store::InventoryStore;
use serde::Serialize;

use super::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct CreatedId {
    pub id: String,
}

#[derive(Serialize)]
pub struct BookingCreatedResponse {
    pub success: bool,
    pub data: Vec<CreatedId>,
}

/// POST /bookings — validate and atomically create a direct booking.
#[tracing::instrument(skip_all)]
pub async fn create<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingCreatedResponse>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let reservation = state.bookings.create(&request).await?;

    Ok((
        StatusCode::CREATED,
        Json(BookingCreatedResponse {
            success: true,
            data: vec![CreatedId {
                id: reservation.id.to_string(),
            }],
        }),
    ))
}
