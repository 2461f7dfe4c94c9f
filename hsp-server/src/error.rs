//! HTTP error envelope: maps domain errors from `hsp_core` (and the
//! server's own validation/rate-limit failures) onto the `{error, message,
//! request_id, details?}` shape every endpoint returns on failure.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    Validation(Vec<ValidationIssue>),
    NotFound(String),
    RateLimited { retry_after_secs: u64 },
    Unauthorized(String),
    Dependency(String),
    Internal(String),
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ValidationIssue {
    pub field: &'static str,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        ValidationIssue { field, message: message.into() }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationIssue>>,
}

impl ApiError {
    fn status_and_body(&self, request_id: String) -> (StatusCode, ErrorBody) {
        match self {
            ApiError::Validation(issues) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody { error: "validation_error", message: "request failed validation".to_string(), request_id, details: Some(issues.clone()) },
            ),
            ApiError::NotFound(what) => {
                (StatusCode::NOT_FOUND, ErrorBody { error: "not_found", message: what.clone(), request_id, details: None })
            }
            ApiError::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorBody { error: "rate_limited", message: "too many requests".to_string(), request_id, details: None },
            ),
            ApiError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, ErrorBody { error: "unauthorized", message: message.clone(), request_id, details: None })
            }
            ApiError::Dependency(message) => {
                (StatusCode::SERVICE_UNAVAILABLE, ErrorBody { error: "dependency_error", message: message.clone(), request_id, details: None })
            }
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody { error: "internal_error", message: message.clone(), request_id, details: None })
            }
        }
    }
}

/// Renders with a caller-supplied request id, so the envelope always
/// carries the same id as the `X-Request-ID` header on the same response.
pub struct WithRequestId(pub String, pub ApiError);

impl IntoResponse for WithRequestId {
    fn into_response(self) -> Response {
        let WithRequestId(request_id, err) = self;
        let retry_after = if let ApiError::RateLimited { retry_after_secs } = &err { Some(*retry_after_secs) } else { None };
        let (status, body) = err.status_and_body(request_id);
        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = axum::http::HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(axum::http::header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<hsp_core::StoreError> for ApiError {
    fn from(err: hsp_core::StoreError) -> Self {
        tracing::error!(error = %err, "store error");
        ApiError::Dependency(err.to_string())
    }
}

impl From<hsp_core::ClientError> for ApiError {
    fn from(err: hsp_core::ClientError) -> Self {
        tracing::error!(error = %err, "upstream client error");
        ApiError::Dependency(err.to_string())
    }
}

impl From<hsp_core::NormalizeError> for ApiError {
    fn from(err: hsp_core::NormalizeError) -> Self {
        tracing::error!(error = %err, "normalize error");
        ApiError::Internal(err.to_string())
    }
}
