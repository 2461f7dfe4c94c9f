//! The shared server state bundled into every Axum handler (spec §4.6),
//! grounded in the `AppState`-as-a-`Clone`-struct-of-`Arc`s pattern from
//! `ob-poc-web`'s `state.rs`.

use std::sync::Arc;

use hsp_core::domain::{FareOffer, PredictionCacheEntry, PredictionFingerprint};
use hsp_core::{Predictor, Store};

use crate::cache::TtlCache;
use crate::metrics::ServerStats;
use crate::rate_limiter::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub predictor: Arc<Predictor>,
    pub prediction_cache: Arc<TtlCache<PredictionFingerprint, PredictionCacheEntry>>,
    pub fare_cache: Arc<TtlCache<String, Vec<FareOffer>>>,
    pub rate_limiter: Arc<RateLimiter>,
    pub stats: Arc<ServerStats>,
    /// If set, `/api/reset-rate-limit` requires a matching `X-Admin-Token`
    /// header. If unset, the endpoint is left to network-level access
    /// control (it is documented as admin-only, not publicly routable).
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(store: Store, admin_token: Option<String>) -> Self {
        let predictor = Predictor::new(store.clone());
        AppState {
            store,
            predictor: Arc::new(predictor),
            prediction_cache: Arc::new(TtlCache::new()),
            fare_cache: Arc::new(TtlCache::new()),
            rate_limiter: Arc::new(RateLimiter::new()),
            stats: Arc::new(ServerStats::new()),
            admin_token,
        }
    }
}
