//! Engine of the departure board.
//!
//! Two independent components live here:
//!
//! - the `Roster`, a per-airport state machine fed by the status reports sent by the ATC plugin,
//!   with a `Sweeper` actor evicting departed aircraft,
//! - the METAR decoder with its `WeatherCache`, deriving CAVOK, LVP state and QFE from the raw
//!   report and the airport elevation.
//!
//! They do not know about each other, the caller composes them.  Both are plain owned objects,
//! to be shared through an `Arc`.
//!

use clap::{crate_name, crate_version};

pub use config::*;
pub use error::*;
pub use roster::*;
pub use weather::*;

mod config;
mod error;
mod roster;
mod weather;

const NAME: &str = crate_name!();
const VERSION: &str = crate_version!();

/// Configuration tag, used for the directory name
pub const TAG: &str = "deplist";

pub fn version() -> String {
    format!("{}/{}", NAME, VERSION)
}
