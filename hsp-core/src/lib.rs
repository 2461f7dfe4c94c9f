//! Ingestion, statistics aggregation, and delay prediction for UK rail HSP
//! data. This crate owns C1 through C5; the HTTP serving layer (C6) lives
//! in the `hsp-server` binary crate.

pub mod aggregator;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod fare_ingest;
pub mod normalizer;
pub mod predictor;
pub mod progress_store;
pub mod scheduler;
pub mod store;
pub mod time;

pub use aggregator::{AggregateReport, NetworkWideStat};
pub use client::{FaresArchive, FaresArchiveDecoder, HspClient, HspClientConfig};
pub use config::{EnvConfig, EnvConfigError, PhaseConfig, RetryConfig, RouteWindow};
pub use error::{ClientError, NormalizeError, PredictionError, StoreError};
pub use fare_ingest::{FareIngester, FareSyncReport};
pub use normalizer::{IngestReport, Normalizer, RepairReport};
pub use predictor::Predictor;
pub use progress_store::ProgressStore;
pub use scheduler::{DayType, PhaseReport};
pub use store::Store;
