//! `POST /api/predict` (spec §4.6): validates input, consults the
//! prediction/fare caches (fronted by the circuit breaker), falls back to
//! the database path on a cache miss or an open breaker, and overlays a
//! fare comparison plus recommendations.

use axum::extract::{Extension, State};
use axum::response::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use hsp_core::domain::{Confidence, FareOffer, PredictionCacheEntry, PredictionLevel, MODEL_VERSION};

use crate::cache::PREDICTION_TTL;
use crate::error::{ApiError, WithRequestId};
use crate::fingerprint::{fare_cache_key, prediction_fingerprint};
use crate::middleware::RequestId;
use crate::recommendations::{build_recommendations, Recommendation};
use crate::state::AppState;
use crate::validation::{parse_crs, parse_departure_date, parse_departure_time};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct PredictRequestBody {
    pub origin: String,
    pub destination: String,
    pub departure_date: String,
    pub departure_time: String,
    #[serde(default)]
    pub include_fares: bool,
    pub operator: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct PredictionDto {
    pub expected_delay_minutes: f64,
    pub on_time_probability: f64,
    pub ppm5_probability: f64,
    pub ppm15_probability: f64,
    pub severe_delay_probability: f64,
    pub confidence: &'static str,
    pub sample_size: u64,
    pub is_degraded: bool,
    pub degradation_reason: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct FareDto {
    pub ticket_type: &'static str,
    pub ticket_class: &'static str,
    pub adult_pence: u32,
    pub child_pence: Option<u32>,
    pub data_source: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct PredictMetadata {
    pub level: u8,
    pub model_version: &'static str,
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct PredictResponseBody {
    pub request_id: String,
    pub prediction: PredictionDto,
    pub fares: Option<Vec<FareDto>>,
    pub recommendations: Vec<Recommendation>,
    pub explanation: String,
    pub metadata: PredictMetadata,
}

#[utoipa::path(
    post,
    path = "/api/predict",
    request_body = PredictRequestBody,
    responses((status = 200, body = PredictResponseBody), (status = 422, description = "validation failure"))
)]
pub async fn predict(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<PredictRequestBody>,
) -> Result<Json<PredictResponseBody>, WithRequestId> {
    let request_id = request_id.0;
    let mut issues = Vec::new();
    let origin = parse_crs("origin", &body.origin, &mut issues);
    let destination = parse_crs("destination", &body.destination, &mut issues);
    let departure_date = parse_departure_date("departure_date", &body.departure_date, &mut issues);
    let departure_time = parse_departure_time("departure_time", &body.departure_time, &mut issues);
    if !issues.is_empty() {
        return Err(WithRequestId(request_id, ApiError::Validation(issues)));
    }
    let (origin, destination, departure_date, departure_time) = (origin.unwrap(), destination.unwrap(), departure_date.unwrap(), departure_time.unwrap());

    let fingerprint = prediction_fingerprint(&origin, &destination, departure_date, departure_time);

    let (entry, cached) = match state.prediction_cache.get(&fingerprint) {
        Some(entry) => (entry, true),
        None => {
            let result = state
                .predictor
                .predict(&origin, &destination, departure_date, departure_time, body.operator.as_deref())
                .await
                .map_err(|e| WithRequestId(request_id.clone(), ApiError::from(e)))?;
            let now = Utc::now();
            let entry = PredictionCacheEntry {
                fingerprint,
                predicted_delay_minutes: result.expected_delay_minutes,
                on_time_probability: result.on_time_probability,
                ppm5_probability: result.ppm5_probability,
                ppm15_probability: result.ppm15_probability,
                severe_delay_probability: result.severe_delay_probability,
                confidence: result.confidence,
                sample_size: result.sample_size,
                level: result.level,
                model_version: MODEL_VERSION,
                created_at: now,
                expires_at: now + chrono::Duration::from_std(PREDICTION_TTL).unwrap(),
                hit_count: 0,
            };
            state.prediction_cache.set(fingerprint, entry.clone(), PREDICTION_TTL);
            (entry, false)
        }
    };

    let level = entry.level;
    let explanation = explain_cached(&entry, level);

    let fares = if body.include_fares {
        let key = fare_cache_key(&origin, &destination);
        let offers = match state.fare_cache.get(&key) {
            Some(offers) => offers,
            None => {
                let offers =
                    state.store.fares_for_route(&origin, &destination).await.map_err(|e| WithRequestId(request_id.clone(), ApiError::from(e)))?;
                state.fare_cache.set(key, offers.clone(), crate::cache::FARE_TTL);
                offers
            }
        };
        if offers.is_empty() { None } else { Some(offers) }
    } else {
        None
    };

    let prediction_result = hsp_core::domain::PredictionResult {
        expected_delay_minutes: entry.predicted_delay_minutes,
        on_time_probability: entry.on_time_probability,
        ppm5_probability: entry.ppm5_probability,
        ppm15_probability: entry.ppm15_probability,
        severe_delay_probability: entry.severe_delay_probability,
        confidence: entry.confidence,
        sample_size: entry.sample_size,
        level,
        is_degraded: level == PredictionLevel::IndustryFloor,
        degradation_reason: (level == PredictionLevel::IndustryFloor).then_some("no_route_data"),
        explanation: explanation.clone(),
    };
    let recommendations = build_recommendations(&prediction_result, fares.as_deref());

    let fares_dto = fares.map(|offers| offers.iter().map(fare_dto).collect());

    Ok(Json(PredictResponseBody {
        request_id,
        prediction: PredictionDto {
            expected_delay_minutes: entry.predicted_delay_minutes,
            on_time_probability: entry.on_time_probability,
            ppm5_probability: entry.ppm5_probability,
            ppm15_probability: entry.ppm15_probability,
            severe_delay_probability: entry.severe_delay_probability,
            confidence: confidence_str(entry.confidence),
            sample_size: prediction_result.sample_size,
            is_degraded: prediction_result.is_degraded,
            degradation_reason: prediction_result.degradation_reason,
        },
        fares: fares_dto,
        recommendations,
        explanation,
        metadata: PredictMetadata { level: level as u8, model_version: entry.model_version, cached },
    }))
}

fn confidence_str(c: Confidence) -> &'static str {
    match c {
        Confidence::High => "high",
        Confidence::Medium => "medium",
        Confidence::Low => "low",
        Confidence::VeryLow => "very_low",
    }
}

fn explain_cached(entry: &PredictionCacheEntry, level: PredictionLevel) -> String {
    if level == PredictionLevel::IndustryFloor {
        return "No statistics are available for this route; falling back to the industry-wide floor.".to_string();
    }
    format!(
        "Expected delay is {:.1} minutes with a {:.0}% chance of an on-time arrival.",
        entry.predicted_delay_minutes,
        entry.on_time_probability * 100.0
    )
}

fn fare_dto(offer: &FareOffer) -> FareDto {
    FareDto {
        ticket_type: ticket_type_str(offer.ticket_type),
        ticket_class: ticket_class_str(offer.ticket_class),
        adult_pence: offer.adult_pence,
        child_pence: offer.child_pence,
        data_source: offer.data_source.clone(),
    }
}

fn ticket_type_str(t: hsp_core::domain::TicketType) -> &'static str {
    use hsp_core::domain::TicketType::*;
    match t {
        Advance => "advance",
        OffPeak => "off_peak",
        Anytime => "anytime",
        SuperOffPeak => "super_off_peak",
        Season => "season",
    }
}

fn ticket_class_str(t: hsp_core::domain::TicketClass) -> &'static str {
    match t {
        hsp_core::domain::TicketClass::Standard => "standard",
        hsp_core::domain::TicketClass::First => "first",
    }
}
