//! The upstream HSP/fares HTTP client (C1). Authenticated, rate-limited,
//! retry-aware. Maintains a single in-flight request at a time; the
//! chunked scheduler (C2) is the only caller and never parallelizes calls
//! to this client, so there is no internal pooling beyond `reqwest`'s own.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::ClientError;
use crate::scheduler::DayType;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
struct Token {
    value: String,
    issued_at: std::time::Instant,
}

impl Token {
    fn is_fresh(&self) -> bool {
        self.issued_at.elapsed() < TOKEN_TTL
    }
}

/// One row of a `fetch_service_metrics` response: a matched service at a
/// matched (origin, destination) pair, enough to key a `fetch_service_details`
/// follow-up call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceMetricsRow {
    pub rid: String,
    pub origin_crs: String,
    pub destination_crs: String,
    pub operator_code: String,
    pub gbtt_departure: Option<String>,
    pub gbtt_arrival: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ServiceMetricsResponse {
    services: Vec<ServiceMetricsRow>,
}

/// One stop in a `fetch_service_details` response. Times are HHMM local
/// strings per spec §6; the normalizer (C3) resolves them against the
/// service's scheduled departure date.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceDetailStop {
    pub location_crs: String,
    pub scheduled_arrival: Option<String>,
    pub scheduled_departure: Option<String>,
    pub actual_arrival: Option<String>,
    pub actual_departure: Option<String>,
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceDetailsResponse {
    pub rid: String,
    pub uid: String,
    pub headcode: String,
    pub operator_code: String,
    pub scheduled_departure_date: NaiveDate,
    pub passenger_service: bool,
    pub stops: Vec<ServiceDetailStop>,
}

/// An opaque binary archive from the fares feed. Its internal layout is
/// outside this spec (§1); `FaresArchiveDecoder` is the seam a production
/// decoder plugs into.
#[derive(Debug, Clone)]
pub struct FaresArchive {
    pub bytes: Vec<u8>,
    pub last_modified: Option<String>,
}

/// The fares archive's fixed-width layout is explicitly out of scope
/// (spec §1); callers supply a decoder implementing this trait.
pub trait FaresArchiveDecoder: Send + Sync {
    fn decode(&self, archive: &FaresArchive) -> Result<Vec<crate::domain::FareOffer>, ClientError>;
}

#[derive(Debug, Clone)]
pub struct HspClientConfig {
    pub base_url: String,
    pub fares_base_url: String,
    pub username: String,
    pub password: String,
    pub retry: RetryConfig,
}

/// Authenticated, rate-limited, retry-aware client over the upstream HSP
/// service-metrics/service-details endpoints and the fares feed.
pub struct HspClient {
    http: reqwest::Client,
    config: HspClientConfig,
    token: RwLock<Option<Token>>,
}

impl HspClient {
    pub fn new(config: HspClientConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client builds with static config");
        HspClient { http, config, token: RwLock::new(None) }
    }

    /// Returns a bearer token, authenticating if none is cached or the
    /// cached one is stale. Refreshed lazily on the first `Authentication`
    /// error following a prior success, per spec §4.1.
    async fn bearer_token(&self) -> Result<String, ClientError> {
        if let Some(token) = self.token.read().await.as_ref() {
            if token.is_fresh() {
                return Ok(token.value.clone());
            }
        }
        self.authenticate().await
    }

    pub async fn authenticate(&self) -> Result<String, ClientError> {
        #[derive(Serialize)]
        struct Body<'a> {
            username: &'a str,
            password: &'a str,
        }
        #[derive(Deserialize)]
        struct Resp {
            token: String,
        }

        let resp = self
            .http
            .post(format!("{}/authenticate", self.config.base_url))
            .json(&Body { username: &self.config.username, password: &self.config.password })
            .send()
            .await
            .map_err(|e| ClientError::Transient(e.to_string()))?;

        let resp = map_status(resp).await?;
        let parsed: Resp = resp.json().await.map_err(|e| ClientError::Protocol(e.to_string()))?;

        *self.token.write().await = Some(Token { value: parsed.token.clone(), issued_at: std::time::Instant::now() });
        Ok(parsed.token)
    }

    pub async fn fetch_service_metrics(
        &self,
        origin: &str,
        destination: &str,
        from_date: NaiveDate,
        to_date: NaiveDate,
        day_types: &[DayType],
        from_time: &str,
        to_time: &str,
    ) -> Result<Vec<ServiceMetricsRow>, ClientError> {
        #[derive(Serialize)]
        struct Body<'a> {
            origin: &'a str,
            destination: &'a str,
            from_date: NaiveDate,
            to_date: NaiveDate,
            day_types: &'a [DayType],
            from_time: &'a str,
            to_time: &'a str,
        }

        let body = Body { origin, destination, from_date, to_date, day_types, from_time, to_time };
        self.with_retry(|| self.post_authenticated("/serviceMetrics", &body)).await.map(|r: ServiceMetricsResponse| r.services)
    }

    pub async fn fetch_service_details(&self, rid: &str) -> Result<ServiceDetailsResponse, ClientError> {
        #[derive(Serialize)]
        struct Body<'a> {
            rid: &'a str,
        }
        self.with_retry(|| self.post_authenticated("/serviceDetails", &Body { rid })).await
    }

    pub async fn fetch_fares_archive(&self, if_newer_than: Option<&str>) -> Result<Option<FaresArchive>, ClientError> {
        let token = self.bearer_token().await?;
        let mut req = self
            .http
            .get(format!("{}/api/staticfeeds/2.0/fares", self.config.fares_base_url))
            .bearer_auth(token);
        if let Some(last_modified) = if_newer_than {
            req = req.header("If-Modified-Since", last_modified);
        }
        let resp = req.send().await.map_err(|e| ClientError::Transient(e.to_string()))?;
        if resp.status() == reqwest::StatusCode::NOT_MODIFIED {
            return Ok(None);
        }
        let last_modified = resp.headers().get("last-modified").and_then(|v| v.to_str().ok()).map(|s| s.to_string());
        let resp = map_status(resp).await?;
        let bytes = resp.bytes().await.map_err(|e| ClientError::Protocol(e.to_string()))?.to_vec();
        Ok(Some(FaresArchive { bytes, last_modified }))
    }

    async fn post_authenticated<B: Serialize, R: for<'de> Deserialize<'de>>(&self, path: &str, body: &B) -> Result<R, ClientError> {
        let token = self.bearer_token().await?;
        let resp = self
            .http
            .post(format!("{}{}", self.config.base_url, path))
            .header("X-Auth-Token", token)
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Transient(e.to_string()))?;
        let resp = map_status(resp).await?;
        resp.json().await.map_err(|e| ClientError::Protocol(e.to_string()))
    }

    /// Runs `attempt` with exponential backoff + jitter (spec §4.1), up to
    /// `retry.max_attempts`, retrying only on [`ClientError::is_retryable`].
    /// A single `Authentication` failure triggers exactly one token
    /// refresh-and-retry, not a full retry budget, since re-authenticating
    /// twice in a row means something deeper than an expired token is
    /// wrong.
    async fn with_retry<R, F, Fut>(&self, attempt: F) -> Result<R, ClientError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<R, ClientError>>,
    {
        let mut reauthed = false;
        for n in 0..self.config.retry.max_attempts {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(ClientError::Authentication(msg)) if !reauthed => {
                    warn!("token expired mid-phase, refreshing: {msg}");
                    reauthed = true;
                    self.authenticate().await?;
                }
                Err(err) if err.is_retryable() && n + 1 < self.config.retry.max_attempts => {
                    let delay = match &err {
                        ClientError::RateLimit { retry_after: Some(hint) } => *hint,
                        _ => self.config.retry.backoff_delay(n),
                    };
                    debug!("retrying after transient error ({err}), sleeping {delay:?}");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
        attempt().await
    }
}

async fn map_status(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    match resp.status() {
        status if status.is_success() => Ok(resp),
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            Err(ClientError::Authentication(resp.text().await.unwrap_or_default()))
        }
        reqwest::StatusCode::BAD_REQUEST => Err(ClientError::Validation(resp.text().await.unwrap_or_default())),
        reqwest::StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(ClientError::RateLimit { retry_after })
        }
        status if status.is_server_error() => Err(ClientError::Transient(format!("http {status}"))),
        status => Err(ClientError::Transient(format!("unexpected http status {status}"))),
    }
}

/// Shared handle type used by the scheduler and CLI wiring.
pub type SharedHspClient = Arc<HspClient>;
