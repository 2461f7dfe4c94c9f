use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::scheduler::DayType;
use super::station::Crs;

/// The stable key identifying one chunk-scheduler task: a route, a day
/// type, and a date sub-range of at most 7 days (spec §4.2).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskKey {
    pub origin: Crs,
    pub destination: Crs,
    pub day_type: DayType,
    pub chunk_start: chrono::NaiveDate,
    pub chunk_end: chrono::NaiveDate,
}

impl std::fmt::Display for TaskKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}->{}/{:?}/{}..{}",
            self.origin, self.destination, self.day_type, self.chunk_start, self.chunk_end
        )
    }
}

/// A post-mortem record of a task that failed non-retryably.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedTask {
    pub task: TaskKey,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

/// Progress checkpoint for one ingestion phase. Modeled as a
/// `completed_tasks` set (skip-on-restart) plus an append-only
/// `failed_tasks` log (post-mortem), per the §9 design note — this
/// replaces the ad-hoc JSON mutation the source used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionProgress {
    pub phase_name: String,
    pub completed_tasks: BTreeSet<TaskKey>,
    pub failed_tasks: Vec<FailedTask>,
    pub total_records_written: u64,
    pub started_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl IngestionProgress {
    pub fn new(phase_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        IngestionProgress {
            phase_name: phase_name.into(),
            completed_tasks: BTreeSet::new(),
            failed_tasks: Vec::new(),
            total_records_written: 0,
            started_at: now,
            last_updated_at: now,
        }
    }

    pub fn is_done(&self, task: &TaskKey) -> bool {
        self.completed_tasks.contains(task)
    }

    pub fn mark_completed(&mut self, task: TaskKey, records_written: u64, now: DateTime<Utc>) {
        self.completed_tasks.insert(task);
        self.total_records_written += records_written;
        self.last_updated_at = now;
    }

    pub fn mark_failed(&mut self, task: TaskKey, error: String, now: DateTime<Utc>) {
        self.failed_tasks.push(FailedTask { task, error, failed_at: now });
        self.last_updated_at = now;
    }
}

/// Per-phase drop counters for structural validation failures at ingest
/// (spec §4.3), persisted into `data_quality_metrics` alongside each batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataQualityMetrics {
    pub phase_name: String,
    pub ingested_at: DateTime<Utc>,
    pub dropped_missing_rid: u64,
    pub dropped_malformed_crs: u64,
    pub dropped_schedule_actual_mismatch: u64,
    pub dropped_delay_out_of_range: u64,
    pub records_written: u64,
}
