//! `GET /health` (spec §4.6): reports database and cache component health
//! so a load balancer can make a routing decision without parsing logs.

use axum::extract::State;
use axum::response::Json;
use chrono::Utc;
use serde::Serialize;

use crate::circuit_breaker::CircuitState;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ComponentHealth {
    pub db: &'static str,
    pub cache: &'static str,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: chrono::DateTime<Utc>,
    pub components: ComponentHealth,
}

#[utoipa::path(get, path = "/health", responses((status = 200, body = HealthResponse)))]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = match sqlx::query("SELECT 1").execute(state.store.pool()).await {
        Ok(_) => "ok",
        Err(_) => "unreachable",
    };
    let cache = if state.prediction_cache.breaker().state() == CircuitState::Open { "degraded" } else { "ok" };

    let status = if db == "ok" { "ok" } else { "degraded" };
    Json(HealthResponse { status, timestamp: Utc::now(), components: ComponentHealth { db, cache } })
}
