//! Where raw METARs come from.
//!
//! The default source is the VATSIM METAR service which returns the raw text of the latest
//! report for `https://metar.vatsim.net/{ICAO}`.
//!

use std::time::Duration;

use chrono::Utc;
use clap::{crate_name, crate_version};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use tracing::{debug, trace, warn};

use crate::{Config, WeatherError};

/// Anything able to give us the raw METAR for an airport.
///
pub trait MetarSource: Send + Sync {
    fn name(&self) -> String;
    fn fetch(&self, airport: &str) -> Result<String, WeatherError>;
}

#[derive(Clone, Debug)]
pub struct Vatsim {
    /// API site
    pub base_url: String,
    client: Client,
}

impl Vatsim {
    pub fn new(base_url: &str, timeout: Duration) -> eyre::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(cfg: &Config) -> eyre::Result<Self> {
        Self::new(&cfg.metar_url, cfg.timeout())
    }
}

impl MetarSource for Vatsim {
    fn name(&self) -> String {
        String::from("vatsim")
    }

    /// The service sits behind a cache, `t` and the headers make sure we get the latest.
    ///
    #[tracing::instrument(skip(self))]
    fn fetch(&self, airport: &str) -> Result<String, WeatherError> {
        let url = format!("{}/{}", self.base_url, airport);
        trace!("Fetching METAR through {}…", url);

        let resp = self
            .client
            .get(&url)
            .query(&[("t", Utc::now().timestamp())])
            .header(
                "user-agent",
                format!("{}/{}", crate_name!(), crate_version!()),
            )
            .header("cache-control", "no-cache")
            .header("pragma", "no-cache")
            .send()
            .map_err(|e| WeatherError::FetchUnavailable(e.to_string()))?;

        if resp.status() != StatusCode::OK {
            warn!("No METAR available for {airport}: {}", resp.status());
            return Err(WeatherError::EmptyReport(airport.to_string()));
        }

        let body = resp
            .text()
            .map_err(|e| WeatherError::FetchUnavailable(e.to_string()))?;
        debug!("body={body}");

        match body.lines().map(str::trim).find(|l| !l.is_empty()) {
            Some(line) => Ok(line.to_string()),
            None => {
                warn!("No METAR available for {airport}");
                Err(WeatherError::EmptyReport(airport.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;

    const RAW: &str = "EGLL 191350Z 27010KT CAVOK 15/05 Q1013";

    #[test]
    fn test_vatsim_fetch() {
        let ua = format!("{}/{}", crate_name!(), crate_version!());
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET)
                .path("/EGLL")
                .query_param_exists("t")
                .header("cache-control", "no-cache")
                .header("pragma", "no-cache")
                .header("user-agent", ua.as_str());
            then.status(200).body(format!("{RAW}\n"));
        });

        let site = Vatsim::new(&server.base_url(), Duration::from_secs(5)).unwrap();
        let raw = site.fetch("EGLL");

        m.assert();
        assert_eq!(Ok(RAW.to_string()), raw);
    }

    #[test]
    fn test_vatsim_empty() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/ZZZZ");
            then.status(200).body("  \n");
        });

        let site = Vatsim::new(&server.base_url(), Duration::from_secs(5)).unwrap();
        let r = site.fetch("ZZZZ");

        m.assert();
        assert_eq!(Err(WeatherError::EmptyReport("ZZZZ".to_string())), r);
    }

    #[test]
    fn test_vatsim_not_found() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/ZZZZ");
            then.status(404);
        });

        let site = Vatsim::new(&server.base_url(), Duration::from_secs(5)).unwrap();
        let r = site.fetch("ZZZZ");

        m.assert();
        assert!(r.unwrap_err().is_fetch());
    }

    #[test]
    fn test_vatsim_unreachable() {
        let site = Vatsim::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let r = site.fetch("EGLL");

        assert!(matches!(r, Err(WeatherError::FetchUnavailable(_))));
    }
}
