//! Assembles the Axum `Router` (spec §4.6): route table, CORS, tracing,
//! per-request observability, and per-client rate limiting, plus the
//! generated OpenAPI document.

pub mod admin;
pub mod feedback;
pub mod health;
pub mod predict;
pub mod stats;
pub mod stops;

use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::middleware::{enforce_rate_limit, observability};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        predict::predict,
        feedback::feedback,
        stats::stats,
        admin::reset_rate_limit,
        stops::route_stops,
    ),
    components(schemas(
        health::ComponentHealth,
        health::HealthResponse,
        predict::PredictRequestBody,
        predict::PredictionDto,
        predict::FareDto,
        predict::PredictMetadata,
        predict::PredictResponseBody,
        feedback::FeedbackRequestBody,
        feedback::FeedbackResponseBody,
        crate::metrics::StatsSnapshot,
        admin::ResetRateLimitResponse,
        stops::StopDto,
        stops::RouteStopsResponse,
        crate::recommendations::Recommendation,
        crate::recommendations::RecommendationTag,
        crate::error::ValidationIssue,
    )),
    tags((name = "hsp", description = "Historical Service Performance prediction and fare API"))
)]
struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/predict", post(predict::predict))
        .route("/feedback", post(feedback::feedback))
        .route("/stats", get(stats::stats))
        .route("/reset-rate-limit", post(admin::reset_rate_limit))
        .route("/routes/:origin/:destination/stops", get(stops::route_stops))
        .layer(axum::middleware::from_fn_with_state(state.clone(), enforce_rate_limit));

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/api/openapi.json", get(openapi_json))
        .nest("/api", api)
        .layer(axum::middleware::from_fn_with_state(state.clone(), observability))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
