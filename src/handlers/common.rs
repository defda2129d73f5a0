use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use validator::Validate;

use crate::errors::ServiceError;
use crate::ApiResponse;

/// Standard success response: `{"success": true, ...payload}`
pub fn success_response<T: Serialize>(payload: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(payload))).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(payload: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(payload))).into_response()
}

/// Validate request input at the handler boundary; nothing runs on failure.
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|e| ServiceError::Validation(e.to_string()))
}
