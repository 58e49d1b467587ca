//! Channel webhook endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use common::Channel;
use engine::WebhookSummary;
use inventory_store::InventoryStore;
use serde::Serialize;
use serde_json::Value;

use super::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: WebhookSummary,
}

/// POST /webhooks/{channel} — reconcile a channel's booking notification.
///
/// Answers 200 once every item has been applied or classified; a 5xx makes
/// the channel redeliver.
#[tracing::instrument(skip(state, payload))]
pub async fn receive<S: InventoryStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(channel): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let channel: Channel = channel
        .parse()
        .map_err(|e: common::UnknownChannel| ApiError::NotFound(e.to_string()))?;
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let summary = state.reconciler.ingest(channel, &body).await?;
    Ok(Json(WebhookResponse {
        success: true,
        summary,
    }))
}
