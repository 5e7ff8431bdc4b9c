use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::binder::error::PlacementError;
use crate::card_source::CardSourceError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error("Card source error: {0}")]
    CardSource(#[from] CardSourceError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                None,
            ),
            AppError::Placement(e) => placement_response(e),
            AppError::CardSource(CardSourceError::SetNotFound(set_id)) => (
                StatusCode::NOT_FOUND,
                "SET_NOT_FOUND",
                format!("Set '{set_id}' not found"),
                None,
            ),
            AppError::CardSource(e @ CardSourceError::RateLimited { .. }) => {
                tracing::warn!("Card source error: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "CARD_SOURCE_RATE_LIMITED",
                    "The card catalogue is rate limiting requests; try again later".to_string(),
                    None,
                )
            }
            AppError::CardSource(e) => {
                tracing::error!("Card source error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "CARD_SOURCE_ERROR",
                    "The card catalogue is unavailable".to_string(),
                    None,
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                    None,
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

fn placement_response(e: &PlacementError) -> (StatusCode, &'static str, String, Option<Value>) {
    match e {
        PlacementError::LimitExceeded {
            requested,
            remaining,
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "LIMIT_EXCEEDED",
            e.to_string(),
            Some(json!({ "requested": requested, "remaining": remaining })),
        ),
        PlacementError::PageLimitExceeded {
            required,
            max_pages,
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "PAGE_LIMIT_EXCEEDED",
            e.to_string(),
            Some(json!({ "required": required, "max_pages": max_pages })),
        ),
        PlacementError::PositionOverflow { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "POSITION_OUT_OF_RANGE",
            e.to_string(),
            None,
        ),
        PlacementError::PositionConflict { .. } => {
            tracing::error!("Placement defect: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "POSITION_CONFLICT",
                "An internal placement error occurred".to_string(),
                None,
            )
        }
        PlacementError::StaleOperation { .. } => (
            StatusCode::CONFLICT,
            "STALE_OPERATION",
            e.to_string(),
            None,
        ),
        PlacementError::EmptyPosition(_) => {
            (StatusCode::NOT_FOUND, "EMPTY_POSITION", e.to_string(), None)
        }
        PlacementError::InvalidMove(_) | PlacementError::InvalidExpansion(_) => (
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            e.to_string(),
            None,
        ),
    }
}
