//! `GET /api/routes/{origin}/{destination}/stops` (spec §4.6): the ordered
//! intermediate stops for a route. The store only ever holds observed
//! history (there is no future-timetable ingest path in this design), so
//! `data_source` is always `"observed"` — see the note on `Store::
//! latest_observed_stops`.

use axum::extract::{Extension, Path, State};
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use hsp_core::domain::Crs;

use crate::error::{ApiError, WithRequestId};
use crate::middleware::RequestId;
use crate::state::AppState;
use crate::validation::parse_crs;

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct StopDto {
    pub location: String,
    pub scheduled_arrival: Option<DateTime<Utc>>,
    pub scheduled_departure: Option<DateTime<Utc>>,
    pub actual_arrival: Option<DateTime<Utc>>,
    pub actual_departure: Option<DateTime<Utc>>,
    pub arrival_delay_minutes: Option<i32>,
    pub departure_delay_minutes: Option<i32>,
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct RouteStopsResponse {
    pub origin: String,
    pub destination: String,
    pub data_source: &'static str,
    pub stops: Vec<StopDto>,
}

#[utoipa::path(
    get,
    path = "/api/routes/{origin}/{destination}/stops",
    responses((status = 200, body = RouteStopsResponse), (status = 404, description = "no observed stops for this route"))
)]
pub async fn route_stops(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((origin, destination)): Path<(String, String)>,
) -> Result<Json<RouteStopsResponse>, WithRequestId> {
    let request_id = request_id.0;
    let mut issues = Vec::new();
    let origin_crs = parse_crs("origin", &origin, &mut issues);
    let destination_crs = parse_crs("destination", &destination, &mut issues);
    if !issues.is_empty() {
        return Err(WithRequestId(request_id, ApiError::Validation(issues)));
    }
    let origin_crs: Crs = origin_crs.unwrap();
    let destination_crs: Crs = destination_crs.unwrap();

    let found = state
        .store
        .latest_observed_stops(&origin_crs, &destination_crs)
        .await
        .map_err(|e| WithRequestId(request_id.clone(), ApiError::from(e)))?;

    let (_, stops) = found.ok_or_else(|| {
        WithRequestId(request_id.clone(), ApiError::NotFound(format!("no observed stops for {} -> {}", origin_crs.as_str(), destination_crs.as_str())))
    })?;

    let stops = stops
        .into_iter()
        .map(|s| StopDto {
            location: s.location,
            scheduled_arrival: s.scheduled_arrival,
            scheduled_departure: s.scheduled_departure,
            actual_arrival: s.actual_arrival,
            actual_departure: s.actual_departure,
            arrival_delay_minutes: s.arrival_delay_minutes,
            departure_delay_minutes: s.departure_delay_minutes,
            cancellation_reason: s.cancellation_reason,
        })
        .collect();

    Ok(Json(RouteStopsResponse {
        origin: origin_crs.as_str().to_string(),
        destination: destination_crs.as_str().to_string(),
        data_source: "observed",
        stops,
    }))
}
