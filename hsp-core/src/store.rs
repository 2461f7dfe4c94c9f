//! The persistence layer backing C3/C4/C5: `service_metrics`,
//! `service_details`, `route_statistics`, `toc_statistics`,
//! `time_slot_statistics`, `prediction_cache`, `fare_cache`, and
//! `data_quality_metrics` (spec §6). Raw `sqlx` queries with explicit
//! column-list constants, grounded in the weather-bingo API's
//! `db-queries.rs` style rather than a query-builder abstraction.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::domain::{Crs, DataQualityMetrics, FareOffer, Grade, OperatorStat, Rid, RouteStat, Service, ServiceStop, TimeSlotStat};
use crate::error::StoreError;

const SERVICE_METRICS_COLS: &str = "rid, uid, headcode, operator_code, scheduled_departure_date, passenger_service";

const SERVICE_DETAILS_COLS: &str = "\
    rid, location, scheduled_arrival, scheduled_departure, actual_arrival, actual_departure, \
    arrival_delay_minutes, departure_delay_minutes, cancellation_reason, provenance";

/// Thin wrapper over a `PgPool`, exposing the query surface C3/C4/C5 need.
/// Every method maps `sqlx::Error` into [`StoreError::Database`].
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Store { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // -- service_metrics / service_details (C3) -----------------------------

    /// Upserts a `Service` row. Per spec §4.3, duplicate keys overwrite
    /// nothing — the earlier record wins — so this is a plain
    /// `ON CONFLICT DO NOTHING`.
    pub async fn upsert_service(&self, service: &Service) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO service_metrics ({SERVICE_METRICS_COLS}) VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (rid) DO NOTHING"
        ))
        .bind(service.rid.as_str())
        .bind(&service.uid)
        .bind(&service.headcode)
        .bind(&service.operator_code)
        .bind(service.scheduled_departure_date)
        .bind(service.passenger_service)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Upserts one stop. `ON CONFLICT (rid, location) DO NOTHING` matches
    /// "the earlier record wins" (spec §4.3); [`Self::update_stop_delays`]
    /// is the only path permitted to revise an existing row, per the
    /// repair-pass convention in `normalizer::repair_delays`.
    pub async fn upsert_stop(&self, stop: &ServiceStop) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO service_details ({SERVICE_DETAILS_COLS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (rid, location) DO NOTHING"
        ))
        .bind(stop.rid.as_str())
        .bind(stop.location.as_str())
        .bind(stop.scheduled_arrival)
        .bind(stop.scheduled_departure)
        .bind(stop.actual_arrival)
        .bind(stop.actual_departure)
        .bind(stop.arrival_delay_minutes)
        .bind(stop.departure_delay_minutes)
        .bind(&stop.cancellation_reason)
        .bind(provenance_str(stop.provenance))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// All stops for one RID, in no particular order — used by
    /// `normalizer::repair_delays`.
    pub async fn stops_for_rid(&self, rid: &Rid) -> Result<Vec<StoredStop>, StoreError> {
        let rows = sqlx::query_as::<_, StoredStop>(&format!(
            "SELECT {SERVICE_DETAILS_COLS} FROM service_details WHERE rid = $1"
        ))
        .bind(rid.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Rewrites `arrival_delay_minutes`/`departure_delay_minutes` for one
    /// stop. The only store method allowed to mutate a `ServiceStop` after
    /// creation (spec §3, §4.3 repair pass).
    pub async fn update_stop_delays(
        &self,
        rid: &Rid,
        location: &Crs,
        arrival_delay_minutes: Option<i32>,
        departure_delay_minutes: Option<i32>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE service_details SET arrival_delay_minutes = $3, departure_delay_minutes = $4, provenance = 'repaired' \
             WHERE rid = $1 AND location = $2",
        )
        .bind(rid.as_str())
        .bind(location.as_str())
        .bind(arrival_delay_minutes)
        .bind(departure_delay_minutes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The ordered intermediate stops of the most recently scheduled service
    /// observed between `origin` and `destination`, for `GET
    /// /api/routes/{origin}/{destination}/stops`. There is no separate
    /// future-timetable source in this store (see DESIGN.md); this always
    /// serves the most recent observed service's stops.
    pub async fn latest_observed_stops(&self, origin: &Crs, destination: &Crs) -> Result<Option<(Rid, Vec<StoredStop>)>, StoreError> {
        let rid: Option<(String,)> = sqlx::query_as(
            "SELECT sm.rid FROM service_metrics sm \
             JOIN service_details origin_sd ON origin_sd.rid = sm.rid AND origin_sd.location = $1 \
             JOIN service_details dest_sd ON dest_sd.rid = sm.rid AND dest_sd.location = $2 \
             ORDER BY sm.scheduled_departure_date DESC LIMIT 1",
        )
        .bind(origin.as_str())
        .bind(destination.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some((rid,)) = rid else { return Ok(None) };
        let rid = Rid::new(rid);

        let stops = sqlx::query_as::<_, StoredStop>(&format!(
            "SELECT {SERVICE_DETAILS_COLS} FROM service_details WHERE rid = $1 \
             ORDER BY COALESCE(scheduled_arrival, scheduled_departure) ASC"
        ))
        .bind(rid.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(Some((rid, stops)))
    }

    pub async fn record_data_quality(&self, metrics: &DataQualityMetrics) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO data_quality_metrics \
             (phase_name, ingested_at, dropped_missing_rid, dropped_malformed_crs, \
              dropped_schedule_actual_mismatch, dropped_delay_out_of_range, records_written) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&metrics.phase_name)
        .bind(metrics.ingested_at)
        .bind(metrics.dropped_missing_rid as i64)
        .bind(metrics.dropped_malformed_crs as i64)
        .bind(metrics.dropped_schedule_actual_mismatch as i64)
        .bind(metrics.dropped_delay_out_of_range as i64)
        .bind(metrics.records_written as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // -- aggregator reads/writes (C4) ----------------------------------------

    /// Distinct (origin, destination) pairs observed in `service_details`,
    /// the grouping key the aggregator iterates over. A route is any two
    /// stops of the same service where one's scheduled departure precedes
    /// the other's scheduled arrival — the same self-join shape
    /// `stops_for_route` queries against, generalized to discovery.
    pub async fn distinct_routes(&self) -> Result<Vec<(Crs, Crs)>, StoreError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT DISTINCT origin_sd.location, dest_sd.location \
             FROM service_details origin_sd \
             JOIN service_details dest_sd ON dest_sd.rid = origin_sd.rid AND dest_sd.location != origin_sd.location \
             WHERE origin_sd.scheduled_departure IS NOT NULL AND dest_sd.scheduled_arrival IS NOT NULL \
               AND origin_sd.scheduled_departure < dest_sd.scheduled_arrival",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .filter_map(|(o, d)| Some((Crs::parse(&o).ok()?, Crs::parse(&d).ok()?)))
            .collect())
    }

    /// Distinct operator codes observed in `service_metrics`.
    pub async fn distinct_operators(&self) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT DISTINCT operator_code FROM service_metrics")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(o,)| o).collect())
    }

    /// Every stop arriving at `destination` from services starting at
    /// `origin`, joined with its scheduled departure hour/weekday — the raw
    /// material for `RouteStat`/`TimeSlotStat`.
    pub async fn stops_for_route(&self, origin: &Crs, destination: &Crs) -> Result<Vec<AggregationRow>, StoreError> {
        let rows = sqlx::query_as::<_, AggregationRow>(
            "SELECT sd.arrival_delay_minutes AS delay_minutes, sd.cancellation_reason, \
                    sd.scheduled_departure AS scheduled_departure, sm.operator_code \
             FROM service_details sd \
             JOIN service_metrics sm ON sm.rid = sd.rid \
             JOIN service_details origin_sd ON origin_sd.rid = sd.rid AND origin_sd.location = $1 \
             WHERE sd.location = $2 AND sd.scheduled_arrival IS NOT NULL",
        )
        .bind(origin.as_str())
        .bind(destination.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Every stop for one operator, regardless of route — the raw material
    /// for `OperatorStat`.
    pub async fn stops_for_operator(&self, operator_code: &str) -> Result<Vec<AggregationRow>, StoreError> {
        let rows = sqlx::query_as::<_, AggregationRow>(
            "SELECT sd.arrival_delay_minutes AS delay_minutes, sd.cancellation_reason, \
                    sd.scheduled_departure AS scheduled_departure, sm.operator_code \
             FROM service_details sd \
             JOIN service_metrics sm ON sm.rid = sd.rid \
             WHERE sm.operator_code = $1 AND sd.scheduled_arrival IS NOT NULL",
        )
        .bind(operator_code)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// `ON CONFLICT (origin, destination, calculation_date) DO UPDATE`: a
    /// second run on the same day overwrites, per spec §4.4.
    pub async fn upsert_route_stat(&self, stat: &RouteStat) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO route_statistics \
             (origin, destination, calculation_date, total_services, punctuality, delay, histogram, \
              cancelled_count, cancelled_percentage, reliability_score, grade, hourly_breakdown, weekday_breakdown) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             ON CONFLICT (origin, destination, calculation_date) DO UPDATE SET \
               total_services = EXCLUDED.total_services, punctuality = EXCLUDED.punctuality, \
               delay = EXCLUDED.delay, histogram = EXCLUDED.histogram, \
               cancelled_count = EXCLUDED.cancelled_count, cancelled_percentage = EXCLUDED.cancelled_percentage, \
               reliability_score = EXCLUDED.reliability_score, grade = EXCLUDED.grade, \
               hourly_breakdown = EXCLUDED.hourly_breakdown, weekday_breakdown = EXCLUDED.weekday_breakdown",
        )
        .bind(stat.origin.as_str())
        .bind(stat.destination.as_str())
        .bind(stat.calculation_date)
        .bind(stat.total_services as i64)
        .bind(serde_json::to_value(stat.punctuality).map_err(StoreError::from)?)
        .bind(serde_json::to_value(stat.delay).map_err(StoreError::from)?)
        .bind(serde_json::to_value(stat.histogram).map_err(StoreError::from)?)
        .bind(stat.cancelled_count as i64)
        .bind(stat.cancelled_percentage)
        .bind(stat.reliability_score)
        .bind(grade_str(stat.grade))
        .bind(serde_json::to_value(&stat.hourly_breakdown).map_err(StoreError::from)?)
        .bind(serde_json::to_value(&stat.weekday_breakdown).map_err(StoreError::from)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn upsert_operator_stat(&self, stat: &OperatorStat) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO toc_statistics \
             (operator_code, calculation_date, total_services, punctuality, delay, histogram, \
              cancelled_count, cancelled_percentage, reliability_score, grade) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (operator_code, calculation_date) DO UPDATE SET \
               total_services = EXCLUDED.total_services, punctuality = EXCLUDED.punctuality, \
               delay = EXCLUDED.delay, histogram = EXCLUDED.histogram, \
               cancelled_count = EXCLUDED.cancelled_count, cancelled_percentage = EXCLUDED.cancelled_percentage, \
               reliability_score = EXCLUDED.reliability_score, grade = EXCLUDED.grade",
        )
        .bind(&stat.operator_code)
        .bind(stat.calculation_date)
        .bind(stat.total_services as i64)
        .bind(serde_json::to_value(stat.punctuality).map_err(StoreError::from)?)
        .bind(serde_json::to_value(stat.delay).map_err(StoreError::from)?)
        .bind(serde_json::to_value(stat.histogram).map_err(StoreError::from)?)
        .bind(stat.cancelled_count as i64)
        .bind(stat.cancelled_percentage)
        .bind(stat.reliability_score)
        .bind(grade_str(stat.grade))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn upsert_time_slot_stat(&self, stat: &TimeSlotStat) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO time_slot_statistics \
             (origin, destination, hour_of_day, day_of_week, calculation_date, total_services, punctuality, delay) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (origin, destination, hour_of_day, day_of_week, calculation_date) DO UPDATE SET \
               total_services = EXCLUDED.total_services, punctuality = EXCLUDED.punctuality, delay = EXCLUDED.delay",
        )
        .bind(stat.origin.as_str())
        .bind(stat.destination.as_str())
        .bind(stat.hour_of_day as i16)
        .bind(stat.day_of_week.map(|d| d as i16))
        .bind(stat.calculation_date)
        .bind(stat.total_services as i64)
        .bind(serde_json::to_value(stat.punctuality).map_err(StoreError::from)?)
        .bind(serde_json::to_value(stat.delay).map_err(StoreError::from)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // -- predictor reads (C5) -------------------------------------------------

    pub async fn latest_route_stat(&self, origin: &Crs, destination: &Crs) -> Result<Option<RouteStat>, StoreError> {
        let row = sqlx::query_as::<_, StoredRouteStat>(
            "SELECT origin, destination, calculation_date, total_services, punctuality, delay, histogram, \
                    cancelled_count, cancelled_percentage, reliability_score, grade, hourly_breakdown, weekday_breakdown \
             FROM route_statistics WHERE origin = $1 AND destination = $2 \
             ORDER BY calculation_date DESC LIMIT 1",
        )
        .bind(origin.as_str())
        .bind(destination.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(StoredRouteStat::into_domain).transpose().map_err(StoreError::from)
    }

    pub async fn latest_operator_stat(&self, operator_code: &str) -> Result<Option<OperatorStat>, StoreError> {
        let row = sqlx::query_as::<_, StoredOperatorStat>(
            "SELECT operator_code, calculation_date, total_services, punctuality, delay, histogram, \
                    cancelled_count, cancelled_percentage, reliability_score, grade \
             FROM toc_statistics WHERE operator_code = $1 ORDER BY calculation_date DESC LIMIT 1",
        )
        .bind(operator_code)
        .fetch_optional(&self.pool)
        .await?;
        row.map(StoredOperatorStat::into_domain).transpose().map_err(StoreError::from)
    }

    /// Network-wide average across the latest row per route — ladder level 4.
    pub async fn network_wide_average(&self) -> Result<Option<crate::aggregator::NetworkWideStat>, StoreError> {
        let routes = self.distinct_routes().await?;
        let mut stats = Vec::new();
        for (origin, destination) in routes {
            if let Some(stat) = self.latest_route_stat(&origin, &destination).await? {
                stats.push(stat);
            }
        }
        Ok(crate::aggregator::combine_network_wide(&stats))
    }

    // -- fare cache (fare ingester sibling) ------------------------------------

    pub async fn upsert_fare(&self, fare: &FareOffer) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO fare_cache \
             (origin, destination, ticket_type, ticket_class, adult_pence, child_pence, valid_from, valid_until, \
              route_restriction, issuing_operator, data_source, ingested_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             ON CONFLICT (origin, destination, ticket_type, ticket_class) DO UPDATE SET \
               adult_pence = EXCLUDED.adult_pence, child_pence = EXCLUDED.child_pence, \
               valid_from = EXCLUDED.valid_from, valid_until = EXCLUDED.valid_until, \
               route_restriction = EXCLUDED.route_restriction, issuing_operator = EXCLUDED.issuing_operator, \
               data_source = EXCLUDED.data_source, ingested_at = EXCLUDED.ingested_at",
        )
        .bind(fare.origin.as_str())
        .bind(fare.destination.as_str())
        .bind(ticket_type_str(fare.ticket_type))
        .bind(ticket_class_str(fare.ticket_class))
        .bind(fare.adult_pence as i32)
        .bind(fare.child_pence.map(|p| p as i32))
        .bind(fare.valid_from)
        .bind(fare.valid_until)
        .bind(&fare.route_restriction)
        .bind(&fare.issuing_operator)
        .bind(&fare.data_source)
        .bind(fare.ingested_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn fares_for_route(&self, origin: &Crs, destination: &Crs) -> Result<Vec<FareOffer>, StoreError> {
        let rows = sqlx::query_as::<_, StoredFare>(
            "SELECT origin, destination, ticket_type, ticket_class, adult_pence, child_pence, valid_from, \
                    valid_until, route_restriction, issuing_operator, data_source, ingested_at \
             FROM fare_cache WHERE origin = $1 AND destination = $2",
        )
        .bind(origin.as_str())
        .bind(destination.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(StoredFare::into_domain).collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }
}

/// Raw row shape for `service_details`, decoded into [`ServiceStop`] by the
/// repair pass.
#[derive(Debug, sqlx::FromRow)]
pub struct StoredStop {
    pub rid: String,
    pub location: String,
    pub scheduled_arrival: Option<DateTime<Utc>>,
    pub scheduled_departure: Option<DateTime<Utc>>,
    pub actual_arrival: Option<DateTime<Utc>>,
    pub actual_departure: Option<DateTime<Utc>>,
    pub arrival_delay_minutes: Option<i32>,
    pub departure_delay_minutes: Option<i32>,
    pub cancellation_reason: Option<String>,
    pub provenance: String,
}

impl StoredStop {
    pub fn into_domain(self) -> Result<ServiceStop, StoreError> {
        Ok(ServiceStop {
            rid: Rid::new(self.rid),
            location: Crs::parse(&self.location).map_err(|e| {
                StoreError::Database(sqlx::Error::Decode(Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))))
            })?,
            scheduled_arrival: self.scheduled_arrival,
            scheduled_departure: self.scheduled_departure,
            actual_arrival: self.actual_arrival,
            actual_departure: self.actual_departure,
            arrival_delay_minutes: self.arrival_delay_minutes,
            departure_delay_minutes: self.departure_delay_minutes,
            cancellation_reason: self.cancellation_reason,
            provenance: parse_provenance(&self.provenance),
        })
    }
}

/// One joined stop used as aggregator input: its effective delay,
/// cancellation flag, scheduled departure instant (for hour/weekday
/// bucketing), and operator code.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AggregationRow {
    pub delay_minutes: Option<i32>,
    pub cancellation_reason: Option<String>,
    pub scheduled_departure: Option<DateTime<Utc>>,
    pub operator_code: String,
}

#[derive(Debug, sqlx::FromRow)]
struct StoredRouteStat {
    origin: String,
    destination: String,
    calculation_date: NaiveDate,
    total_services: i64,
    punctuality: serde_json::Value,
    delay: serde_json::Value,
    histogram: serde_json::Value,
    cancelled_count: i64,
    cancelled_percentage: f64,
    reliability_score: f64,
    grade: String,
    hourly_breakdown: serde_json::Value,
    weekday_breakdown: serde_json::Value,
}

impl StoredRouteStat {
    fn into_domain(self) -> Result<RouteStat, StoreError> {
        Ok(RouteStat {
            origin: parse_crs(&self.origin)?,
            destination: parse_crs(&self.destination)?,
            calculation_date: self.calculation_date,
            total_services: self.total_services as u64,
            punctuality: serde_json::from_value(self.punctuality)?,
            delay: serde_json::from_value(self.delay)?,
            histogram: serde_json::from_value(self.histogram)?,
            cancelled_count: self.cancelled_count as u64,
            cancelled_percentage: self.cancelled_percentage,
            reliability_score: self.reliability_score,
            grade: parse_grade(&self.grade),
            hourly_breakdown: serde_json::from_value(self.hourly_breakdown)?,
            weekday_breakdown: serde_json::from_value(self.weekday_breakdown)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StoredOperatorStat {
    operator_code: String,
    calculation_date: NaiveDate,
    total_services: i64,
    punctuality: serde_json::Value,
    delay: serde_json::Value,
    histogram: serde_json::Value,
    cancelled_count: i64,
    cancelled_percentage: f64,
    reliability_score: f64,
    grade: String,
}

impl StoredOperatorStat {
    fn into_domain(self) -> Result<OperatorStat, StoreError> {
        Ok(OperatorStat {
            operator_code: self.operator_code,
            calculation_date: self.calculation_date,
            total_services: self.total_services as u64,
            punctuality: serde_json::from_value(self.punctuality)?,
            delay: serde_json::from_value(self.delay)?,
            histogram: serde_json::from_value(self.histogram)?,
            cancelled_count: self.cancelled_count as u64,
            cancelled_percentage: self.cancelled_percentage,
            reliability_score: self.reliability_score,
            grade: parse_grade(&self.grade),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StoredFare {
    origin: String,
    destination: String,
    ticket_type: String,
    ticket_class: String,
    adult_pence: i32,
    child_pence: Option<i32>,
    valid_from: NaiveDate,
    valid_until: Option<NaiveDate>,
    route_restriction: Option<String>,
    issuing_operator: Option<String>,
    data_source: String,
    ingested_at: DateTime<Utc>,
}

impl StoredFare {
    fn into_domain(self) -> Result<FareOffer, StoreError> {
        Ok(FareOffer {
            origin: parse_crs(&self.origin)?,
            destination: parse_crs(&self.destination)?,
            ticket_type: parse_ticket_type(&self.ticket_type),
            ticket_class: parse_ticket_class(&self.ticket_class),
            adult_pence: self.adult_pence as u32,
            child_pence: self.child_pence.map(|p| p as u32),
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            route_restriction: self.route_restriction,
            issuing_operator: self.issuing_operator,
            data_source: self.data_source,
            ingested_at: self.ingested_at,
        })
    }
}

fn parse_crs(raw: &str) -> Result<Crs, StoreError> {
    Crs::parse(raw)
        .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())))))
}

fn provenance_str(p: crate::domain::Provenance) -> &'static str {
    match p {
        crate::domain::Provenance::Observed => "observed",
        crate::domain::Provenance::Repaired => "repaired",
    }
}

fn parse_provenance(raw: &str) -> crate::domain::Provenance {
    match raw {
        "repaired" => crate::domain::Provenance::Repaired,
        _ => crate::domain::Provenance::Observed,
    }
}

fn grade_str(g: Grade) -> &'static str {
    match g {
        Grade::A => "A",
        Grade::B => "B",
        Grade::C => "C",
        Grade::D => "D",
        Grade::F => "F",
    }
}

fn parse_grade(raw: &str) -> Grade {
    match raw {
        "A" => Grade::A,
        "B" => Grade::B,
        "C" => Grade::C,
        "D" => Grade::D,
        _ => Grade::F,
    }
}

fn ticket_type_str(t: crate::domain::TicketType) -> &'static str {
    use crate::domain::TicketType::*;
    match t {
        Advance => "advance",
        OffPeak => "off_peak",
        Anytime => "anytime",
        SuperOffPeak => "super_off_peak",
        Season => "season",
    }
}

fn parse_ticket_type(raw: &str) -> crate::domain::TicketType {
    use crate::domain::TicketType::*;
    match raw {
        "advance" => Advance,
        "off_peak" => OffPeak,
        "super_off_peak" => SuperOffPeak,
        "season" => Season,
        _ => Anytime,
    }
}

fn ticket_class_str(t: crate::domain::TicketClass) -> &'static str {
    match t {
        crate::domain::TicketClass::Standard => "standard",
        crate::domain::TicketClass::First => "first",
    }
}

fn parse_ticket_class(raw: &str) -> crate::domain::TicketClass {
    match raw {
        "first" => crate::domain::TicketClass::First,
        _ => crate::domain::TicketClass::Standard,
    }
}
