//! Observability middleware (spec §4.6): every response carries
//! `X-Request-ID` (16 random hex chars) and `X-Process-Time` (ms); a timing
//! layer logs method, path, status, and elapsed time at `info`.

use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use rand::RngCore;
use tracing::info;

use crate::error::{ApiError, WithRequestId};
use crate::fingerprint::client_fingerprint;
use crate::rate_limiter::RateLimited;
use crate::state::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
const PROCESS_TIME_HEADER: &str = "x-process-time";

/// Random 16 hex character request id, per spec §4.6.
pub fn generate_request_id() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Tags every request with an id, times it, logs the outcome, and folds the
/// elapsed time into `ServerStats`. Runs for every route, API or not.
pub async fn observability(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let request_id = generate_request_id();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let mut request = request;
    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    let elapsed = start.elapsed();
    state.stats.record_request(elapsed);
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&elapsed.as_millis().to_string()) {
        response.headers_mut().insert(PROCESS_TIME_HEADER, value);
    }

    info!(
        method = %method,
        path,
        status = response.status().as_u16(),
        elapsed_ms = elapsed.as_millis() as u64,
        request_id,
        "request handled"
    );

    response
}

/// Per-client rate limiting (spec §4.6), applied to the `/api` surface only
/// — `/health` and the OpenAPI document stay reachable under load.
pub async fn enforce_rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let ip = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .unwrap_or("unknown")
        .trim()
        .to_string();
    let user_agent = request.headers().get(axum::http::header::USER_AGENT).and_then(|v| v.to_str().ok()).unwrap_or("unknown").to_string();
    let fingerprint = client_fingerprint(&ip, &user_agent);

    let request_id = request.extensions().get::<RequestId>().map(|id| id.0.clone()).unwrap_or_default();

    match state.rate_limiter.is_allowed(&fingerprint) {
        Ok(()) => next.run(request).await,
        Err(RateLimited { retry_after_secs }) => {
            state.stats.record_rate_limit_hit();
            WithRequestId(request_id, ApiError::RateLimited { retry_after_secs }).into_response()
        }
    }
}

/// Request-scoped id, threaded through `axum::Extension` so handlers can
/// echo it in their own error/response bodies without re-deriving it.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_sixteen_hex_characters() {
        let id = generate_request_id();
        assert_eq!(id.len(), 16);
        assert!(id.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn request_ids_are_not_constant() {
        assert_ne!(generate_request_id(), generate_request_id());
    }
}
