//! `POST /api/feedback` (spec §4.6): records a rider's report against a
//! prior prediction. Per §9's open question, `actual_delay_minutes` is not
//! wired back into the aggregator — it is validated and logged for later,
//! explicitly out-of-band, analysis rather than silently folded into stats.

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ValidationIssue, WithRequestId};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct FeedbackRequestBody {
    pub request_id: String,
    pub actual_delay_minutes: Option<i32>,
    pub was_cancelled: Option<bool>,
    pub rating: u8,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FeedbackResponseBody {
    pub feedback_id: String,
    pub received_at: DateTime<Utc>,
}

#[utoipa::path(
    post,
    path = "/api/feedback",
    request_body = FeedbackRequestBody,
    responses((status = 201, body = FeedbackResponseBody), (status = 422, description = "validation failure"))
)]
pub async fn feedback(
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<FeedbackRequestBody>,
) -> Result<Response, WithRequestId> {
    let correlation_id = request_id.0;
    let mut issues = Vec::new();

    if !(1..=5).contains(&body.rating) {
        issues.push(ValidationIssue::new("rating", "must be between 1 and 5"));
    }
    if let Some(comment) = &body.comment {
        if comment.chars().count() > 500 {
            issues.push(ValidationIssue::new("comment", "must be at most 500 characters"));
        }
    }
    if body.request_id.trim().is_empty() {
        issues.push(ValidationIssue::new("request_id", "must not be empty"));
    }
    if !issues.is_empty() {
        return Err(WithRequestId(correlation_id, ApiError::Validation(issues)));
    }

    let feedback_id = generate_feedback_id();
    let received_at = Utc::now();

    tracing::info!(
        feedback_id,
        prediction_request_id = body.request_id,
        actual_delay_minutes = body.actual_delay_minutes,
        was_cancelled = body.was_cancelled,
        rating = body.rating,
        comment = body.comment.as_deref().unwrap_or(""),
        "prediction feedback received"
    );

    Ok((StatusCode::CREATED, Json(FeedbackResponseBody { feedback_id, received_at })).into_response())
}

fn generate_feedback_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
