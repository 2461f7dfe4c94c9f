//! The chunked fetch scheduler (C2): splits a configured date range into
//! ≤7-day chunks, iterates `routes × day_types × date_chunks` strictly
//! sequentially, checkpoints after each task's store commit, and persists
//! progress with write-temp-then-rename semantics.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::client::HspClient;
use crate::config::PhaseConfig;
use crate::domain::{Crs, IngestionProgress, TaskKey};
use crate::error::NormalizeError;
use crate::normalizer::Normalizer;
use crate::progress_store::ProgressStore;

/// A day-type partition of the HSP query space (spec glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DayType {
    Weekday,
    Saturday,
    Sunday,
}

/// Splits `[from, to]` into contiguous chunks of at most 7 days each (the
/// last chunk may be shorter). Chunk boundaries are a pure function of
/// `from`/`to`, so they are stable across runs — spec §4.2/§8.
pub fn chunk_date_range(from: NaiveDate, to: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    const MAX_CHUNK_DAYS: i64 = 7;
    let mut chunks = Vec::new();
    let mut cursor = from;
    while cursor <= to {
        let chunk_end = std::cmp::min(cursor + ChronoDuration::days(MAX_CHUNK_DAYS - 1), to);
        chunks.push((cursor, chunk_end));
        cursor = chunk_end + ChronoDuration::days(1);
    }
    chunks
}

/// The full expansion of a phase config into its task set, in the
/// lexicographic `(route, day_type, chunk_start)` order that spec §5
/// requires tasks be processed in.
pub fn expand_tasks(config: &PhaseConfig) -> Result<Vec<TaskKey>, crate::domain::station::InvalidCrs> {
    let chunks = chunk_date_range(config.from_date, config.to_date);
    let mut tasks = Vec::new();
    for route in &config.routes {
        let origin = Crs::parse(&route.origin)?;
        let destination = Crs::parse(&route.destination)?;
        for day_type in &config.day_types {
            for (chunk_start, chunk_end) in &chunks {
                tasks.push(TaskKey {
                    origin,
                    destination,
                    day_type: *day_type,
                    chunk_start: *chunk_start,
                    chunk_end: *chunk_end,
                });
            }
        }
    }
    tasks.sort_by(|a, b| {
        (a.origin, a.destination, a.day_type, a.chunk_start).cmp(&(b.origin, b.destination, b.day_type, b.chunk_start))
    });
    Ok(tasks)
}

/// Outcome of one `run_phase` invocation, for CLI reporting.
#[derive(Debug, Clone, Default)]
pub struct PhaseReport {
    pub tasks_completed: usize,
    pub tasks_skipped: usize,
    pub tasks_failed: usize,
    pub records_written: u64,
}

/// Runs one ingestion phase to completion (or until cancelled). Tasks are
/// processed strictly sequentially — a single in-flight HTTP request at a
/// time — with the configured inter-request sleep between them (spec §4.2,
/// §5).
pub async fn run_phase(
    config: &PhaseConfig,
    client: Arc<HspClient>,
    normalizer: Arc<Normalizer>,
    progress_store: Arc<ProgressStore>,
    cancel: CancellationToken,
) -> Result<PhaseReport, NormalizeError> {
    let tasks = expand_tasks(config).map_err(|e| NormalizeError::MalformedCrs(e.to_string()))?;
    let mut progress = progress_store
        .load(&config.phase_name)
        .await?
        .unwrap_or_else(|| IngestionProgress::new(&config.phase_name, chrono::Utc::now()));

    let mut report = PhaseReport::default();

    for task in tasks {
        if cancel.is_cancelled() {
            info!("cancellation observed, persisting progress and exiting cleanly");
            break;
        }
        if progress.is_done(&task) {
            report.tasks_skipped += 1;
            continue;
        }

        match run_one_task(&task, config, &client, &normalizer).await {
            Ok(records_written) => {
                // Checkpoint only after the store has acknowledged the batch,
                // so a crash here never advertises an uncommitted task as done.
                progress.mark_completed(task.clone(), records_written, chrono::Utc::now());
                progress_store.save(&progress).await?;
                report.tasks_completed += 1;
                report.records_written += records_written;
            }
            Err(err) if is_non_retryable(&err) => {
                warn!("task {task} failed non-retryably: {err}");
                progress.mark_failed(task.clone(), err.to_string(), chrono::Utc::now());
                progress_store.save(&progress).await?;
                report.tasks_failed += 1;
            }
            Err(err) => {
                error!("task {task} failed unexpectedly: {err}");
                return Err(err);
            }
        }

        if cancel.is_cancelled() {
            break;
        }
        tokio::time::sleep(config.request_interval.sample()).await;
    }

    Ok(report)
}

fn is_non_retryable(err: &NormalizeError) -> bool {
    match err {
        NormalizeError::Store(_) => false,
        _ => true,
    }
}

async fn run_one_task(
    task: &TaskKey,
    config: &PhaseConfig,
    client: &HspClient,
    normalizer: &Normalizer,
) -> Result<u64, NormalizeError> {
    let route = config
        .routes
        .iter()
        .find(|r| r.origin.eq_ignore_ascii_case(task.origin.as_str()) && r.destination.eq_ignore_ascii_case(task.destination.as_str()))
        .expect("task was expanded from this config's routes");

    let metrics = client
        .fetch_service_metrics(
            task.origin.as_str(),
            task.destination.as_str(),
            task.chunk_start,
            task.chunk_end,
            std::slice::from_ref(&task.day_type),
            &route.from_time,
            &route.to_time,
        )
        .await?;

    let mut details = Vec::with_capacity(metrics.len());
    for row in &metrics {
        details.push(client.fetch_service_details(&row.rid).await?);
    }

    // One `ingest_batch` call per task, so exactly one data-quality row is
    // written per task rather than one per matched service.
    let report = normalizer.ingest_batch(&config.phase_name, &details).await?;
    Ok(report.records_written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_split_into_at_most_seven_days() {
        let from = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let chunks = chunk_date_range(from, to);
        assert_eq!(chunks.len(), 9);
        assert_eq!(chunks[0], (from, NaiveDate::from_ymd_opt(2024, 12, 7).unwrap()));
        assert_eq!(chunks.last().unwrap().1, to);
        // All but the last are exactly 7 days; the last is 6 (Jan 26-31).
        for (start, end) in &chunks[..chunks.len() - 1] {
            assert_eq!((*end - *start).num_days(), 6);
        }
        let (last_start, last_end) = *chunks.last().unwrap();
        assert_eq!((last_end - last_start).num_days(), 5);
    }

    #[test]
    fn chunks_are_contiguous_and_cover_the_range() {
        let from = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let chunks = chunk_date_range(from, to);
        assert_eq!(chunks[0].0, from);
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].0, pair[0].1 + ChronoDuration::days(1));
        }
        assert_eq!(chunks.last().unwrap().1, to);
    }

    #[test]
    fn single_day_range_yields_one_chunk() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(chunk_date_range(day, day), vec![(day, day)]);
    }
}
