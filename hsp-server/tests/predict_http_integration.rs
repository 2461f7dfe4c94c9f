//! HTTP-level integration tests for the prediction/fare serving layer (C6).
//!
//! These tests prove the deployed HTTP server contract: input validation,
//! the degraded-prediction fallback, request-id/process-time headers, and
//! the rate limiter's 429 response.
//!
//! Requires a running PostgreSQL database with the tables this crate's
//! `Store` queries against (created inline below, since the physical SQL
//! schema is outside this system's spec).
//! Run with: DATABASE_URL="postgresql:///hsp_test" cargo test -p hsp-server --test predict_http_integration -- --ignored --nocapture

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

#[path = "../src/cache.rs"]
mod cache;
#[path = "../src/circuit_breaker.rs"]
mod circuit_breaker;
#[path = "../src/decoder.rs"]
mod decoder;
#[path = "../src/error.rs"]
mod error;
#[path = "../src/fingerprint.rs"]
mod fingerprint;
#[path = "../src/metrics.rs"]
mod metrics;
#[path = "../src/middleware.rs"]
mod middleware;
#[path = "../src/rate_limiter.rs"]
mod rate_limiter;
#[path = "../src/recommendations.rs"]
mod recommendations;
#[path = "../src/routes/mod.rs"]
mod routes;
#[path = "../src/state.rs"]
mod state;
#[path = "../src/validation.rs"]
mod validation;

use state::AppState;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS service_metrics (
    rid TEXT PRIMARY KEY,
    uid TEXT NOT NULL,
    headcode TEXT NOT NULL,
    operator_code TEXT NOT NULL,
    scheduled_departure_date DATE NOT NULL,
    passenger_service BOOLEAN NOT NULL
);
CREATE TABLE IF NOT EXISTS service_details (
    rid TEXT NOT NULL,
    location TEXT NOT NULL,
    scheduled_arrival TIMESTAMPTZ,
    scheduled_departure TIMESTAMPTZ,
    actual_arrival TIMESTAMPTZ,
    actual_departure TIMESTAMPTZ,
    arrival_delay_minutes INTEGER,
    departure_delay_minutes INTEGER,
    cancellation_reason TEXT,
    provenance TEXT NOT NULL,
    PRIMARY KEY (rid, location)
);
CREATE TABLE IF NOT EXISTS route_statistics (
    origin TEXT NOT NULL,
    destination TEXT NOT NULL,
    calculation_date DATE NOT NULL,
    total_services BIGINT NOT NULL,
    punctuality JSONB NOT NULL,
    delay JSONB NOT NULL,
    histogram JSONB NOT NULL,
    cancelled_count BIGINT NOT NULL,
    cancelled_percentage DOUBLE PRECISION NOT NULL,
    reliability_score DOUBLE PRECISION NOT NULL,
    grade TEXT NOT NULL,
    hourly_breakdown JSONB NOT NULL,
    weekday_breakdown JSONB NOT NULL,
    UNIQUE (origin, destination, calculation_date)
);
CREATE TABLE IF NOT EXISTS toc_statistics (
    operator_code TEXT NOT NULL,
    calculation_date DATE NOT NULL,
    total_services BIGINT NOT NULL,
    punctuality JSONB NOT NULL,
    delay JSONB NOT NULL,
    histogram JSONB NOT NULL,
    cancelled_count BIGINT NOT NULL,
    cancelled_percentage DOUBLE PRECISION NOT NULL,
    reliability_score DOUBLE PRECISION NOT NULL,
    grade TEXT NOT NULL,
    UNIQUE (operator_code, calculation_date)
);
CREATE TABLE IF NOT EXISTS time_slot_statistics (
    origin TEXT NOT NULL,
    destination TEXT NOT NULL,
    hour_of_day SMALLINT NOT NULL,
    day_of_week SMALLINT,
    calculation_date DATE NOT NULL,
    total_services BIGINT NOT NULL,
    punctuality JSONB NOT NULL,
    delay JSONB NOT NULL,
    UNIQUE (origin, destination, hour_of_day, day_of_week, calculation_date)
);
CREATE TABLE IF NOT EXISTS fare_cache (
    origin TEXT NOT NULL,
    destination TEXT NOT NULL,
    ticket_type TEXT NOT NULL,
    ticket_class TEXT NOT NULL,
    adult_pence INTEGER NOT NULL,
    child_pence INTEGER,
    valid_from DATE NOT NULL,
    valid_until DATE,
    route_restriction TEXT,
    issuing_operator TEXT,
    data_source TEXT NOT NULL,
    ingested_at TIMESTAMPTZ NOT NULL,
    UNIQUE (origin, destination, ticket_type, ticket_class)
);
CREATE TABLE IF NOT EXISTS data_quality_metrics (
    phase_name TEXT NOT NULL,
    ingested_at TIMESTAMPTZ NOT NULL,
    dropped_missing_rid BIGINT NOT NULL,
    dropped_malformed_crs BIGINT NOT NULL,
    dropped_schedule_actual_mismatch BIGINT NOT NULL,
    dropped_delay_out_of_range BIGINT NOT NULL,
    records_written BIGINT NOT NULL
);
"#;

async fn test_app() -> axum::Router {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for this ignored integration test");
    let pool = PgPoolOptions::new().max_connections(5).connect(&database_url).await.expect("connect to test database");
    for statement in SCHEMA.split(";\n") {
        if !statement.trim().is_empty() {
            sqlx::query(statement).execute(&pool).await.expect("apply inline test schema");
        }
    }
    let store = hsp_core::Store::new(pool);
    let state = AppState::new(store, Some("test-admin-token".to_string()));
    routes::build_router(state)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
#[ignore]
async fn health_reports_ok_against_a_reachable_database() {
    let app = test_app().await;
    let response = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["components"]["db"], "ok");
}

#[tokio::test]
#[ignore]
async fn predict_on_an_unseeded_route_returns_the_degraded_floor() {
    let app = test_app().await;
    let departure_date = (chrono::Utc::now().date_naive() + chrono::Duration::days(7)).format("%Y-%m-%d").to_string();
    let payload = serde_json::json!({
        "origin": "XXX",
        "destination": "YYY",
        "departure_date": departure_date,
        "departure_time": "09:30",
        "include_fares": false,
    });
    let request = Request::builder()
        .method("POST")
        .uri("/api/predict")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert!(response.headers().contains_key("x-process-time"));
    let body = body_json(response).await;
    assert_eq!(body["prediction"]["is_degraded"], true);
    assert_eq!(body["prediction"]["degradation_reason"], "no_route_data");
    assert_eq!(body["prediction"]["confidence"], "very_low");
}

#[tokio::test]
#[ignore]
async fn predict_rejects_a_malformed_crs_with_422() {
    let app = test_app().await;
    let departure_date = (chrono::Utc::now().date_naive() + chrono::Duration::days(7)).format("%Y-%m-%d").to_string();
    let payload = serde_json::json!({
        "origin": "eus",
        "destination": "MAN",
        "departure_date": departure_date,
        "departure_time": "09:30",
    });
    let request = Request::builder()
        .method("POST")
        .uri("/api/predict")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
    assert!(body["details"].as_array().unwrap().iter().any(|d| d["field"] == "origin"));
}

#[tokio::test]
#[ignore]
async fn feedback_rejects_an_out_of_range_rating() {
    let app = test_app().await;
    let payload = serde_json::json!({
        "request_id": "abc123",
        "rating": 7,
    });
    let request = Request::builder()
        .method("POST")
        .uri("/api/feedback")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[ignore]
async fn feedback_accepts_a_well_formed_report() {
    let app = test_app().await;
    let payload = serde_json::json!({
        "request_id": "abc123",
        "actual_delay_minutes": 4,
        "was_cancelled": false,
        "rating": 5,
        "comment": "arrived a few minutes late but fine",
    });
    let request = Request::builder()
        .method("POST")
        .uri("/api/feedback")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert!(body["feedback_id"].is_string());
}

#[tokio::test]
#[ignore]
async fn reset_rate_limit_requires_the_admin_token() {
    let app = test_app().await;
    let request = Request::builder().method("POST").uri("/api/reset-rate-limit").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn reset_rate_limit_succeeds_with_the_right_token() {
    let app = test_app().await;
    let request =
        Request::builder().method("POST").uri("/api/reset-rate-limit").header("x-admin-token", "test-admin-token").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore]
async fn stops_for_an_unobserved_route_return_404() {
    let app = test_app().await;
    let request = Request::builder().uri("/api/routes/XXX/YYY/stops").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
