//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use domain_warranty::WorkflowError;

use crate::auth::AuthError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Business rules violated")]
    RuleViolation(Vec<String>),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized".to_string(), None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg, None),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", msg, None),
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg, None),
            ApiError::RuleViolation(violations) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "rule_violation",
                "Business rules violated".to_string(),
                Some(violations),
            ),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        let message = err.to_string();
        match err {
            WorkflowError::ClaimNotFound(_) | WorkflowError::ApprovalNotFound(_) => ApiError::NotFound(message),
            WorkflowError::Forbidden { .. } | WorkflowError::NotAssignedApprover { .. } => {
                ApiError::Forbidden(message)
            }
            WorkflowError::InvalidTransition { .. }
            | WorkflowError::AlreadyDecided { .. }
            | WorkflowError::ApprovalsAlreadyInitialized(_)
            | WorkflowError::ApprovalChainIncomplete { .. }
            | WorkflowError::StaleApproval(_)
            | WorkflowError::EscalationExhausted { .. } => ApiError::Conflict(message),
            WorkflowError::MissingReason { .. }
            | WorkflowError::ApproverNotEligible { .. }
            | WorkflowError::Validation(_) => ApiError::Validation(message),
            WorkflowError::RuleViolation(violations) => {
                ApiError::RuleViolation(violations.iter().map(ToString::to_string).collect())
            }
            WorkflowError::NoApproverAvailable { .. } => ApiError::Unavailable(message),
            WorkflowError::Configuration(_) | WorkflowError::Persistence(_) => {
                error!(error = %message, "Workflow failure");
                ApiError::Internal(message)
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(_: AuthError) -> Self {
        ApiError::Unauthorized
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}
