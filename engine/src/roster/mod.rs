//! The roster keeps, for every tracked airport, the aircraft currently on the departure board.
//!
//! The plugin reports partial and sometimes out-of-order updates per callsign; `apply()`
//! reconciles them following these rules:
//!
//! - `CLEAR` removes the aircraft, whether it was there or not
//! - `AIRBORNE` on a known aircraft only changes the status, the flight plan is kept
//! - any other status merges the supplied fields into the record
//! - a new record is only ever created from a ground state, `AIRBORNE` for an unknown
//!   aircraft is ignored
//!
//! The timestamp of a record only moves when its status actually changes.  It drives both the
//! "time in this state" display and the eviction of AIRBORNE aircraft by `sweep()`.
//!
//! Locking: the whole map sits behind one `RwLock`, which gives `get_all()` a consistent view.
//! `sweep()` takes the write lock once per airport.
//!

use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing::{debug, info, trace, warn};

pub use record::*;
pub use sweeper::*;

use crate::{Airports, Config, RosterError};

mod record;
mod sweeper;

/// Result of a successfully validated report.
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// New aircraft on the board
    Created,
    /// Known aircraft modified
    Updated,
    /// `CLEAR` processed, `removed` tells whether there was something to remove
    Cleared { removed: bool },
    /// Acknowledged but nothing done
    Ignored(IgnoreReason),
}

/// Soft conditions, never an error.
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IgnoreReason {
    UnconfiguredAirport(String),
    UnknownAircraft(String),
}

impl Display for IgnoreReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IgnoreReason::UnconfiguredAirport(code) => write!(f, "Airport {code} not configured"),
            IgnoreReason::UnknownAircraft(_) => write!(f, "Aircraft not tracked"),
        }
    }
}

impl Outcome {
    pub fn success(&self) -> bool {
        !matches!(self, Outcome::Ignored(_))
    }

    pub fn reason(&self) -> Option<String> {
        match self {
            Outcome::Ignored(r) => Some(r.to_string()),
            _ => None,
        }
    }
}

/// Aircraft for one airport, in insertion order with a callsign index.
///
#[derive(Debug, Default)]
struct AirportRoster {
    /// Next insertion number
    next: u64,
    /// Records by insertion number
    order: BTreeMap<u64, AircraftRecord>,
    /// Callsign to insertion number
    index: HashMap<String, u64>,
}

impl AirportRoster {
    fn get_mut(&mut self, callsign: &str) -> Option<&mut AircraftRecord> {
        let seq = self.index.get(callsign)?;
        self.order.get_mut(seq)
    }

    fn insert(&mut self, rec: AircraftRecord) {
        let seq = self.next;
        self.next += 1;
        self.index.insert(rec.callsign.clone(), seq);
        self.order.insert(seq, rec);
    }

    fn remove(&mut self, callsign: &str) -> Option<AircraftRecord> {
        let seq = self.index.remove(callsign)?;
        self.order.remove(&seq)
    }

    /// Keep only the records for which `f` is true, returns how many were dropped.
    ///
    fn retain<F>(&mut self, mut f: F) -> usize
    where
        F: FnMut(&AircraftRecord) -> bool,
    {
        let before = self.order.len();
        let index = &mut self.index;
        self.order.retain(|_, rec| {
            let keep = f(rec);
            if !keep {
                index.remove(&rec.callsign);
            }
            keep
        });
        before - self.order.len()
    }

    fn records(&self) -> Vec<AircraftRecord> {
        self.order.values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// The departure roster itself, owned by whoever composes the application and shared
/// through an `Arc`.
///
#[derive(Debug)]
pub struct Roster {
    /// Tracked airports
    airports: Airports,
    /// How long AIRBORNE aircraft are kept
    retention: TimeDelta,
    inner: RwLock<BTreeMap<String, AirportRoster>>,
}

impl Roster {
    pub fn new(airports: Airports, retention: Duration) -> Self {
        Self {
            airports,
            retention: TimeDelta::from_std(retention).unwrap_or(TimeDelta::MAX),
            inner: RwLock::new(BTreeMap::new()),
        }
    }

    /// Retention window, also the interval between sweeps.
    ///
    pub fn retention(&self) -> Duration {
        self.retention.to_std().unwrap_or_default()
    }

    pub fn airports(&self) -> &Airports {
        &self.airports
    }

    // Nothing leaves the map half-modified, so a poisoned lock is still usable.
    //
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, AirportRoster>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, AirportRoster>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply one status report now.
    ///
    pub fn apply(&self, report: StatusReport) -> Result<Outcome, RosterError> {
        self.apply_at(report, Utc::now())
    }

    /// Apply one status report as if received at `now`.
    ///
    #[tracing::instrument(skip(self))]
    pub fn apply_at(
        &self,
        report: StatusReport,
        now: DateTime<Utc>,
    ) -> Result<Outcome, RosterError> {
        let update = report.validate()?;
        let Update {
            callsign,
            airport,
            action,
            plan,
        } = update;

        if !self.airports.is_tracked(&airport) {
            debug!("{airport} is not configured, ignoring {callsign}");
            return Ok(Outcome::Ignored(IgnoreReason::UnconfiguredAirport(airport)));
        }

        let mut inner = self.write();

        let status = match action {
            Action::Clear => {
                let removed = match inner.get_mut(&airport) {
                    Some(list) => {
                        let removed = list.remove(&callsign).is_some();
                        if list.is_empty() {
                            inner.remove(&airport);
                        }
                        removed
                    }
                    None => false,
                };
                if removed {
                    info!("Removed {callsign} from {airport}");
                }
                return Ok(Outcome::Cleared { removed });
            }
            Action::Set(status) => status,
        };

        let existing = inner
            .get_mut(&airport)
            .and_then(|list| list.get_mut(&callsign));

        let outcome = match existing {
            Some(rec) => {
                // AIRBORNE carries no flight plan, keep what we have.
                //
                if status.is_ground() {
                    rec.plan.merge(plan);
                }
                // A repeated status, AIRBORNE included, keeps the time it was first
                // reached: retention counts from take-off, not from the last report.
                //
                if rec.status != status {
                    trace!("{callsign}: {} -> {status}", rec.status);
                    rec.status = status;
                    rec.last_updated = now;
                }
                Outcome::Updated
            }
            None if status.is_ground() => {
                let rec = AircraftRecord {
                    callsign: callsign.clone(),
                    airport: airport.clone(),
                    status,
                    plan,
                    last_updated: now,
                };
                inner.entry(airport.clone()).or_default().insert(rec);
                Outcome::Created
            }
            None => {
                warn!("Received {status} for unknown aircraft {callsign}, ignoring");
                return Ok(Outcome::Ignored(IgnoreReason::UnknownAircraft(callsign)));
            }
        };

        info!("Updated {callsign} at {airport}: {status}");
        Ok(outcome)
    }

    /// Everything, airport by airport.
    ///
    pub fn get_all(&self) -> BTreeMap<String, Vec<AircraftRecord>> {
        self.read()
            .iter()
            .map(|(airport, list)| (airport.clone(), list.records()))
            .collect()
    }

    /// One airport, empty if nothing is known about it.
    ///
    pub fn get_by_airport(&self, code: &str) -> Vec<AircraftRecord> {
        self.read()
            .get(&code.to_uppercase())
            .map(AirportRoster::records)
            .unwrap_or_default()
    }

    /// Total number of aircraft on the board.
    ///
    pub fn len(&self) -> usize {
        self.read().values().map(AirportRoster::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Evict AIRBORNE aircraft older than the retention window.
    ///
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    /// Evict AIRBORNE aircraft whose last update is at least one retention window before
    /// `now`, then drop airports left empty.  Returns the number of aircraft removed.
    ///
    #[tracing::instrument(skip(self))]
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let airports: Vec<String> = self.read().keys().cloned().collect();

        let removed = airports
            .iter()
            .map(|airport| {
                let mut inner = self.write();
                let Some(list) = inner.get_mut(airport) else {
                    return 0;
                };
                let removed = list.retain(|rec| {
                    !(rec.status == Status::Airborne && now - rec.last_updated >= self.retention)
                });
                if list.is_empty() {
                    inner.remove(airport);
                }
                removed
            })
            .sum();

        if removed > 0 {
            info!("Auto cleanup removed {removed} aircraft");
        }
        removed
    }

    /// Table of the whole roster for display.
    ///
    pub fn list(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(["Airport", "Callsign", "Status", "SID", "Squawk", "Route", "Since"]);

        self.get_all().values().flatten().for_each(|rec| {
            let status = rec.status.to_string();
            let since = rec.last_updated.format("%H:%M:%S").to_string();
            builder.push_record([
                rec.airport.as_str(),
                rec.callsign.as_str(),
                status.as_str(),
                rec.plan.sid.as_deref().unwrap_or(""),
                rec.plan.squawk.as_deref().unwrap_or(""),
                rec.plan.route.as_deref().unwrap_or(""),
                since.as_str(),
            ]);
        });
        builder.build().with(Style::modern()).to_string()
    }
}

impl From<&Config> for Roster {
    fn from(cfg: &Config) -> Self {
        Roster::new(cfg.airports(), cfg.retention())
    }
}
