//! This is the module handling the `decode` sub-command.
//!

use eyre::Result;
use tracing::trace;

use deplist_engine::{decode, Config};

use crate::DecodeOpts;

/// Decode a METAR given on the command line, returns the snapshot as JSON.
///
/// The elevation is either given explicitly or taken from a configured airport.
///
#[tracing::instrument(skip(cfg))]
pub fn decode_metar(cfg: &Config, dopts: &DecodeOpts) -> Result<String> {
    trace!("decode_metar");

    let raw = dopts.raw.join(" ");
    let elevation = match (dopts.elevation, &dopts.airport) {
        (Some(e), _) => Some(e),
        (None, Some(airport)) => cfg.airports().elevation(airport),
        (None, None) => None,
    };

    let snapshot = decode(&raw, elevation)?;
    Ok(serde_json::to_string_pretty(&snapshot)?)
}
