//! Configuration for the engine.
//!
//! The file is in HCL and lists every tracked airport with its (optional) elevation:
//!
//! ```hcl
//! version   = 1
//! retention = 180
//! metar_ttl = 300
//!
//! airport "EGLL" { elevation = 83 }
//! airport "XXXX" { }
//! ```
//!

use std::collections::btree_map::Iter;
use std::collections::BTreeMap;
use std::time::Duration;

use eyre::{eyre, Result};
use serde::Deserialize;
use tabled::builder::Builder;
use tabled::settings::Style;

use deplist_common::Versioned;

/// Current version
pub const CVERSION: usize = 1;
/// How long an AIRBORNE aircraft stays on the board, also the sweep interval.
pub const DEF_RETENTION: u64 = 180;
/// METAR cache lifetime.
pub const DEF_METAR_TTL: u64 = 300;
/// Where we get raw METARs from.
pub const DEF_METAR_URL: &str = "https://metar.vatsim.net";
/// Timeout of a single METAR fetch.
pub const DEF_TIMEOUT: u64 = 5;
/// Upper bound for every delay in the file, one day.
pub const MAX_DELAY: u64 = 86_400;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub version: usize,
    /// Seconds
    #[serde(default = "def_retention")]
    pub retention: u64,
    /// Seconds
    #[serde(default = "def_metar_ttl")]
    pub metar_ttl: u64,
    #[serde(default = "def_metar_url")]
    pub metar_url: String,
    /// Seconds
    #[serde(default = "def_timeout")]
    pub timeout: u64,
    /// Each tracked airport
    #[serde(default)]
    pub airport: BTreeMap<String, AirportConfig>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AirportConfig {
    /// Feet above mean sea level
    pub elevation: Option<i32>,
}

fn def_retention() -> u64 {
    DEF_RETENTION
}

fn def_metar_ttl() -> u64 {
    DEF_METAR_TTL
}

fn def_metar_url() -> String {
    DEF_METAR_URL.to_string()
}

fn def_timeout() -> u64 {
    DEF_TIMEOUT
}

impl Versioned for Config {
    const VERSION: usize = CVERSION;

    fn version(&self) -> usize {
        self.version
    }

    /// Every delay must be at least one second and at most `MAX_DELAY`.
    ///
    fn check(&self) -> Result<()> {
        [
            ("retention", self.retention),
            ("metar_ttl", self.metar_ttl),
            ("timeout", self.timeout),
        ]
        .into_iter()
        .try_for_each(|(name, secs)| match secs {
            1..=MAX_DELAY => Ok(()),
            _ => Err(eyre!("{name} = {secs} out of range, must be 1..={MAX_DELAY}s")),
        })
    }
}

/// The London airports the departure board has always been set up for.
///
impl Default for Config {
    fn default() -> Self {
        let airport = [("EGLL", 83), ("EGKK", 202), ("EGSS", 348), ("EGGW", 526)]
            .into_iter()
            .map(|(code, elevation)| {
                (
                    code.to_string(),
                    AirportConfig {
                        elevation: Some(elevation),
                    },
                )
            })
            .collect();
        Self {
            version: CVERSION,
            retention: DEF_RETENTION,
            metar_ttl: DEF_METAR_TTL,
            metar_url: DEF_METAR_URL.to_string(),
            timeout: DEF_TIMEOUT,
            airport,
        }
    }
}

impl Config {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention)
    }

    pub fn metar_ttl(&self) -> Duration {
        Duration::from_secs(self.metar_ttl)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Normalised view of the airport table.
    ///
    pub fn airports(&self) -> Airports {
        Airports::from(&self.airport)
    }
}

/// Set of tracked airports, ICAO codes in upper case, with their elevation if known.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Airports(BTreeMap<String, Option<i32>>);

impl Airports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: &str, elevation: Option<i32>) -> &mut Self {
        self.0.insert(code.to_uppercase(), elevation);
        self
    }

    pub fn is_tracked(&self, code: &str) -> bool {
        self.0.contains_key(&code.to_uppercase())
    }

    /// Elevation in feet, `None` for unknown airports or when not configured.
    ///
    pub fn elevation(&self, code: &str) -> Option<i32> {
        self.0.get(&code.to_uppercase()).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, String, Option<i32>> {
        self.0.iter()
    }

    /// Table of airports for display.
    ///
    pub fn list(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(["ICAO", "Elevation (ft)"]);
        self.0.iter().for_each(|(code, elevation)| {
            let elevation = elevation.map_or("N/A".to_string(), |e| e.to_string());
            builder.push_record([code.as_str(), elevation.as_str()]);
        });
        builder.build().with(Style::modern()).to_string()
    }
}

impl From<&BTreeMap<String, AirportConfig>> for Airports {
    fn from(value: &BTreeMap<String, AirportConfig>) -> Self {
        let mut airports = Airports::new();
        value.iter().for_each(|(code, cfg)| {
            airports.insert(code, cfg.elevation);
        });
        airports
    }
}

impl<const N: usize> From<[(&str, Option<i32>); N]> for Airports {
    fn from(value: [(&str, Option<i32>); N]) -> Self {
        let mut airports = Airports::new();
        value.iter().for_each(|(code, elevation)| {
            airports.insert(code, *elevation);
        });
        airports
    }
}
