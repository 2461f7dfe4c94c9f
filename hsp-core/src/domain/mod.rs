pub mod fare;
pub mod prediction;
pub mod progress;
pub mod service;
pub mod station;
pub mod stats;

pub use fare::{FareOffer, TicketClass, TicketType};
pub use prediction::{Confidence, PredictionCacheEntry, PredictionFingerprint, PredictionLevel, PredictionResult, MODEL_VERSION};
pub use progress::{DataQualityMetrics, FailedTask, IngestionProgress, TaskKey};
pub use service::{Provenance, Rid, Service, ServiceStop};
pub use station::{Crs, Nlc, Operator, Station};
pub use stats::{DelayHistogram, DelaySummary, Grade, OperatorStat, PunctualityPercentages, RouteStat, TimeSlotStat};
