//! Guest-facing reservation endpoints: token cancellation and lookups.
//!
//! All of these are rate limited per client.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use chrono::{DateTime, NaiveDate, Utc};
use domain::{PaymentStatus, Reservation, ReservationStatus};
use engine::ChannelSync;
use inventory_store::InventoryStore;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ApiError;
use crate::rate_limit::client_key;

// -- Request types --

#[derive(Deserialize)]
pub struct CancelRequest {
    pub token: Option<String>,
}

#[derive(Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

// -- Response types --

/// A reservation as shown to guests and operators.
///
/// The cancellation token is never echoed back.
#[derive(Serialize)]
pub struct ReservationResponse {
    pub id: String,
    pub hotel_id: i64,
    pub room_id: i64,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: Option<String>,
    pub arrival: NaiveDate,
    pub departure: NaiveDate,
    pub nights: u32,
    pub adults: u32,
    pub children: u32,
    pub total_price: f64,
    pub status: ReservationStatus,
    pub payment_status: PaymentStatus,
    pub channel: Option<String>,
    pub external_booking_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Reservation> for ReservationResponse {
    fn from(r: &Reservation) -> Self {
        Self {
            id: r.id.to_string(),
            hotel_id: r.hotel_id.as_i64(),
            room_id: r.room_id.as_i64(),
            guest_name: r.guest.name.clone(),
            guest_email: r.guest.email.clone(),
            guest_phone: r.guest.phone.clone(),
            arrival: r.stay.arrival(),
            departure: r.stay.departure(),
            nights: r.stay.nights(),
            adults: r.adults,
            children: r.children,
            total_price: r.total_price.as_decimal(),
            status: r.status,
            payment_status: r.payment_status,
            channel: r.external.as_ref().map(|e| e.channel.to_string()),
            external_booking_id: r.external.as_ref().map(|e| e.booking_id.clone()),
            notes: r.notes.clone(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct ReservationEnvelope {
    pub success: bool,
    pub data: ReservationResponse,
}

#[derive(Serialize)]
pub struct ReservationListEnvelope {
    pub success: bool,
    pub data: Vec<ReservationResponse>,
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub success: bool,
    pub channel_sync: Option<ChannelSync>,
}

// -- Handlers --

/// POST /reservations/cancel — cancel with the guest's token.
#[tracing::instrument(skip_all)]
pub async fn cancel_by_token<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    payload: Result<Json<CancelRequest>, JsonRejection>,
) -> Result<Json<CancelResponse>, ApiError> {
    enforce_rate_limit(&state, &headers).await?;
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let token = request
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("token is required".to_string()))?;

    let outcome = state.reservations.cancel_by_token(token.trim()).await?;
    Ok(Json(CancelResponse {
        success: true,
        channel_sync: outcome.channel_sync,
    }))
}

/// GET /reservations/by-token/{token} — show the reservation a token belongs to.
#[tracing::instrument(skip_all)]
pub async fn get_by_token<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(token): Path<String>,
) -> Result<Json<ReservationEnvelope>, ApiError> {
    enforce_rate_limit(&state, &headers).await?;
    let reservation = state.reservations.resolve_by_token(&token).await?;
    Ok(Json(ReservationEnvelope {
        success: true,
        data: ReservationResponse::from(&reservation),
    }))
}

/// GET /reservations?email= — the guest's current and upcoming stays.
#[tracing::instrument(skip_all)]
pub async fn list_by_email<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Query(query): Query<EmailQuery>,
) -> Result<Json<ReservationListEnvelope>, ApiError> {
    enforce_rate_limit(&state, &headers).await?;
    let email = query
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("email is required".to_string()))?;

    let reservations = state.reservations.list_by_email(&email).await?;
    Ok(Json(ReservationListEnvelope {
        success: true,
        data: reservations.iter().map(ReservationResponse::from).collect(),
    }))
}

async fn enforce_rate_limit<S: InventoryStore>(
    state: &AppState<S>,
    headers: &HeaderMap,
) -> Result<(), ApiError> {
    if state.rate_limiter.check(&client_key(headers)).await {
        Ok(())
    } else {
        Err(ApiError::RateLimited)
    }
}
