//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use engine::EngineError;
use serde_json::json;

/// API-level error type that maps to HTTP responses.
///
/// Every error body is `{"success": false, "error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// The client exceeded its request budget.
    RateLimited,
    /// Engine operation error.
    Engine(EngineError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, envelope(msg)),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, envelope(msg)),
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                envelope("Too many requests, please try again later".to_string()),
            ),
            ApiError::Engine(err) => engine_error_to_response(err),
        };

        (status, Json(body)).into_response()
    }
}

fn envelope(message: String) -> serde_json::Value {
    json!({ "success": false, "error": message })
}

fn engine_error_to_response(err: EngineError) -> (StatusCode, serde_json::Value) {
    match &err {
        EngineError::ValidationFailed(failure) => {
            let first = failure
                .first()
                .map(ToString::to_string)
                .unwrap_or_else(|| err.to_string());
            let violations: Vec<String> =
                failure.violations().iter().map(ToString::to_string).collect();
            (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": first, "violations": violations }),
            )
        }
        EngineError::InvalidPayload(_) => (StatusCode::BAD_REQUEST, envelope(err.to_string())),
        EngineError::NotFound { .. } => (StatusCode::NOT_FOUND, envelope(err.to_string())),
        EngineError::InvalidTransition(_)
        | EngineError::CapacityExceeded { .. }
        | EngineError::Conflict(_) => (StatusCode::CONFLICT, envelope(err.to_string())),
        EngineError::Configuration(_) => {
            tracing::error!(error = %err, "configuration error");
            (StatusCode::INTERNAL_SERVER_ERROR, envelope(err.to_string()))
        }
        EngineError::Persistence(_) => {
            tracing::error!(error = %err, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                envelope("Internal server error".to_string()),
            )
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use common::{ReservationId, RoomId};
    use domain::{ValidationFailure, Violation};

    use super::*;

    fn status_of(err: EngineError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_engine_error_status_codes() {
        let date = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        assert_eq!(
            status_of(EngineError::ValidationFailed(ValidationFailure::new(vec![
                Violation::InvalidEmail
            ]))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(EngineError::reservation_not_found(ReservationId::new())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(EngineError::CapacityExceeded {
                room_id: RoomId::new(1),
                arrival: date,
                departure: date.succ_opt().unwrap(),
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(EngineError::Conflict(ReservationId::new())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(EngineError::Configuration("no adapter".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rate_limited_is_429() {
        assert_eq!(
            ApiError::RateLimited.into_response().status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
