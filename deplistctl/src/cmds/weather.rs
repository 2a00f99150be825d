//! This is the module handling the `weather` sub-command.
//!

use eyre::Result;
use tracing::{info, trace};

use deplist_engine::{Config, Vatsim, WeatherCache};

use crate::WeatherOpts;

/// Fetch and decode weather for every airport asked for.  One airport failing does not stop
/// the others.
///
#[tracing::instrument(skip(cfg))]
pub fn fetch_weather(cfg: &Config, wopts: &WeatherOpts) -> Result<()> {
    trace!("fetch_weather");

    let source = Vatsim::from_config(cfg)?;
    let cache = WeatherCache::new(source, cfg.airports(), cfg.metar_ttl());

    for airport in &wopts.airports {
        match cache.get(airport) {
            Ok(snapshot) => println!("{}", serde_json::to_string_pretty(snapshot.as_ref())?),
            Err(e) => {
                info!("{airport}: {e}");
                println!("{}: weather unavailable", airport.to_uppercase());
            }
        }
    }
    Ok(())
}
