use thiserror::Error;

/// Errors raised by the upstream HSP/fares HTTP client (C1).
///
/// The retryable variants (`RateLimit`, `Transient`) are the only ones the
/// chunked scheduler (C2) will retry; everything else aborts the task.
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP 401/403. Not retryable; the caller should refresh the token and
    /// try the whole task again from the top, not just the failed request.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// HTTP 400. The request itself was malformed; retrying would repeat
    /// the same mistake.
    #[error("validation rejected by upstream: {0}")]
    Validation(String),
    /// HTTP 429. Retryable; `retry_after` is the server's hint, if any.
    #[error("rate limited by upstream, retry_after={retry_after:?}")]
    RateLimit { retry_after: Option<std::time::Duration> },
    /// HTTP 5xx, connection reset, or timeout. Retryable.
    #[error("transient upstream failure: {0}")]
    Transient(String),
    /// The response body did not parse as the expected shape.
    #[error("could not parse upstream response: {0}")]
    Protocol(String),
}

impl ClientError {
    /// Whether the chunked scheduler (C2) should retry a request that failed
    /// with this error, per spec §4.1.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::RateLimit { .. } | ClientError::Transient(_))
    }
}

/// Errors raised while normalizing and upserting records into the store (C3).
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("record missing required field: {0}")]
    MissingField(&'static str),
    #[error("malformed CRS code: {0:?}")]
    MalformedCrs(String),
    #[error("scheduled time after actual time by more than the configured threshold")]
    ScheduleActualMismatch,
    #[error("delay {0} minutes outside admissible range [-180, 720]")]
    DelayOutOfRange(i32),
    #[error("civil time could not be resolved in Europe/London: {0}")]
    AmbiguousLocalTime(String),
    #[error("upstream client error during ingestion: {0}")]
    Upstream(#[from] ClientError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised by the persistence layer (sqlx-backed store, or the
/// write-temp-then-rename progress journal).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("progress journal io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("progress journal serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Errors raised by the prediction engine (C5). These are all programmer
/// errors per spec §7 — the fallback ladder's last rung never fails, so
/// reaching this means a caller bypassed it.
#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("no prediction level produced a result, including the hard-coded floor")]
    LadderExhausted,
}
