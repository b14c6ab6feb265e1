//! Error types for the job pack API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use document_engine::EngineError;
use render_engine::RenderError;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Missing or invalid caller identity: {0}")]
    Unauthenticated(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, Option<Value>) {
        match self {
            ApiError::Engine(e) => match e {
                EngineError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", None),
                EngineError::Access(_) => (StatusCode::FORBIDDEN, "ACCESS_DENIED", None),
                EngineError::Validation(check) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "ISSUER_INCOMPLETE",
                    Some(json!({
                        "missingRequired": check.missing_required,
                        "missingRecommended": check.missing_recommended,
                        "warnings": check.warnings,
                    })),
                ),
                EngineError::Conflict { expected, actual } => (
                    StatusCode::CONFLICT,
                    "VERSION_CONFLICT",
                    Some(json!({ "expectedVersion": expected, "currentVersion": actual })),
                ),
                EngineError::AlreadyIssued(record_id) => (
                    StatusCode::CONFLICT,
                    "ALREADY_ISSUED",
                    Some(json!({ "issuedRecordId": record_id })),
                ),
                EngineError::TableRowMinimum { section_id, min_rows } => (
                    StatusCode::BAD_REQUEST,
                    "TABLE_ROW_MINIMUM",
                    Some(json!({ "sectionId": section_id, "minRows": min_rows })),
                ),
                EngineError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST", None),
                EngineError::Generation(_) => (
                    StatusCode::BAD_GATEWAY,
                    "GENERATION_FAILED",
                    Some(json!({ "retryable": true })),
                ),
                EngineError::TemplateValidation(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "TEMPLATE_INVALID", None)
                }
                EngineError::Storage(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    Some(json!({ "retryable": true })),
                ),
            },
            ApiError::Render(e) => match e {
                RenderError::NotIssued => (StatusCode::BAD_REQUEST, "NOT_ISSUED", None),
                RenderError::Timeout(_) => (StatusCode::REQUEST_TIMEOUT, "TIMEOUT", None),
                RenderError::Compile(errors) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "COMPILE_ERROR",
                    Some(json!({ "errors": errors })),
                ),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "RENDER_ERROR", None),
            },
            ApiError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", None),
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST", None),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, details) = self.parts();

        let error = if status.is_server_error() {
            tracing::error!(code, "{}", self);
            match &self {
                // Internal details stay in the log
                ApiError::Engine(EngineError::Storage(_)) => "Storage failure".to_string(),
                _ => self.to_string(),
            }
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            success: false,
            error,
            code,
            details,
        };

        (status, Json(body)).into_response()
    }
}
