//! `POST /api/reset-rate-limit` (spec §4.6): admin-only, clears the
//! in-memory rate-limit table. Gated on `X-Admin-Token` when the server was
//! started with one configured; otherwise left to network-level access
//! control (see `AppState::admin_token`).

use axum::extract::{Extension, State};
use axum::http::HeaderMap;
use axum::response::Json;
use serde::Serialize;

use crate::error::{ApiError, WithRequestId};
use crate::middleware::RequestId;
use crate::state::AppState;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ResetRateLimitResponse {
    pub cleared_clients: usize,
}

#[utoipa::path(
    post,
    path = "/api/reset-rate-limit",
    responses((status = 200, body = ResetRateLimitResponse), (status = 401, description = "missing or wrong admin token"))
)]
pub async fn reset_rate_limit(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<ResetRateLimitResponse>, WithRequestId> {
    let request_id = request_id.0;

    if let Some(expected) = &state.admin_token {
        let provided = headers.get("x-admin-token").and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            return Err(WithRequestId(request_id, ApiError::Unauthorized("missing or invalid admin token".to_string())));
        }
    }

    let cleared_clients = state.rate_limiter.tracked_clients();
    state.rate_limiter.reset_all();
    Ok(Json(ResetRateLimitResponse { cleared_clients }))
}
