//! `GET /api/stats` (spec §4.6): a snapshot of request-volume and
//! rate-limiting counters for operators, not for end-user consumption.

use axum::extract::State;
use axum::response::Json;

use crate::metrics::StatsSnapshot;
use crate::state::AppState;

#[utoipa::path(get, path = "/api/stats", responses((status = 200, body = StatsSnapshot)))]
pub async fn stats(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot())
}
