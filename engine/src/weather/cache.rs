//! METAR cache.
//!
//! One entry per airport, valid for `ttl` after it was fetched.  A miss or an expired entry
//! triggers one fetch and one decode.  When either fails the old entry stays where it is and
//! only the current request gets the error.
//!
//! The map is a `DashMap` so only one shard is locked at a time, and never during a fetch.
//!

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use tracing::{debug, info, trace, warn};

use crate::{decode, Airports, MetarSource, WeatherError, WeatherSnapshot};

#[derive(Clone, Debug)]
struct CacheEntry {
    fetched: DateTime<Utc>,
    snapshot: Arc<WeatherSnapshot>,
}

#[derive(Debug)]
pub struct WeatherCache<S: MetarSource> {
    source: S,
    /// For elevations
    airports: Airports,
    ttl: TimeDelta,
    entries: DashMap<String, CacheEntry>,
}

impl<S: MetarSource> WeatherCache<S> {
    pub fn new(source: S, airports: Airports, ttl: Duration) -> Self {
        Self {
            source,
            airports,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            entries: DashMap::new(),
        }
    }

    /// Latest weather for `airport`.
    ///
    pub fn get(&self, airport: &str) -> Result<Arc<WeatherSnapshot>, WeatherError> {
        self.get_at(airport, Utc::now())
    }

    /// Latest weather for `airport` as seen at `now`.
    ///
    #[tracing::instrument(skip(self))]
    pub fn get_at(
        &self,
        airport: &str,
        now: DateTime<Utc>,
    ) -> Result<Arc<WeatherSnapshot>, WeatherError> {
        let airport = airport.to_uppercase();

        let cached = self.entries.get(&airport).map(|e| e.value().clone());
        if let Some(entry) = cached {
            if now - entry.fetched < self.ttl {
                trace!("cache hit for {airport}");
                return Ok(entry.snapshot);
            }
            debug!("cache entry for {airport} expired");
        }

        let raw = self.source.fetch(&airport).inspect_err(|e| {
            warn!("Error fetching METAR for {airport} from {}: {e}", self.source.name());
        })?;
        let snapshot = decode(&raw, self.airports.elevation(&airport)).inspect_err(|e| {
            warn!("Error decoding METAR for {airport}: {e}");
        })?;
        let snapshot = Arc::new(snapshot);

        self.entries.insert(
            airport.clone(),
            CacheEntry {
                fetched: now,
                snapshot: snapshot.clone(),
            },
        );
        info!("Fetched fresh METAR for {airport}");
        Ok(snapshot)
    }

    /// Whatever we have for `airport`, fresh or not.
    ///
    pub fn cached(&self, airport: &str) -> Option<Arc<WeatherSnapshot>> {
        self.entries
            .get(&airport.to_uppercase())
            .map(|e| e.snapshot.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
