//! Module describing all possible commands and sub-commands to the `deplistctl` main driver
//!
//! - `decode` decodes a METAR given on the command line
//! - `weather` fetches and decodes the latest METAR for some airports
//! - `replay` feeds a file of status reports into a fresh roster and shows the result
//! - `run` reads status reports from `stdin` with the sweeper running in the background
//! - `list` shows the configured airports
//!
//! `completion` is here just to configure the various shells completion system.
//!

use std::path::PathBuf;

use clap::{crate_authors, crate_description, crate_name, crate_version, Parser, ValueEnum};
use clap_complete::shells::Shell;

/// CLI options
#[derive(Parser)]
#[command(disable_version_flag = true)]
#[clap(name = crate_name!(), about = crate_description!())]
#[clap(version = crate_version!(), author = crate_authors!())]
pub struct Opts {
    /// configuration file.
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,
    /// debug mode, hierarchical traces.
    #[clap(short = 'D', long = "debug")]
    pub debug: bool,
    /// Also log into this directory.
    #[clap(short = 'L', long)]
    pub log_dir: Option<String>,
    /// Sub-commands (see below).
    #[clap(subcommand)]
    pub subcmd: SubCommand,
}

// ------

/// All sub-commands:
///
/// `completion SHELL`
/// `decode [-a ICAO] [-e FEET] RAW…`
/// `weather ICAO…`
/// `replay FILE`
/// `run`
/// `list airports`
/// `version`
///
#[derive(Debug, Parser)]
pub enum SubCommand {
    /// Generate Completion stuff
    Completion(ComplOpts),
    /// Decode a raw METAR
    Decode(DecodeOpts),
    /// Fetch and decode weather for airports
    Weather(WeatherOpts),
    /// Apply a JSON-lines file of status reports
    Replay(ReplayOpts),
    /// Apply status reports read from stdin
    Run,
    /// List information about configuration
    List(ListOpts),
    /// List all package versions
    Version,
}

// ------

/// Options to decode one METAR.
///
#[derive(Debug, Parser)]
pub struct DecodeOpts {
    /// Take the elevation from this configured airport.
    #[clap(short = 'a', long)]
    pub airport: Option<String>,
    /// Airport elevation in feet, needed for QFE.
    #[clap(short = 'e', long, allow_negative_numbers = true)]
    pub elevation: Option<i32>,
    /// Raw report, can be given unquoted.
    #[clap(required = true)]
    pub raw: Vec<String>,
}

// ------

#[derive(Debug, Parser)]
pub struct WeatherOpts {
    /// ICAO codes.
    #[clap(required = true)]
    pub airports: Vec<String>,
}

// ------

#[derive(Debug, Parser)]
pub struct ReplayOpts {
    /// One JSON status report per line.
    pub file: PathBuf,
}

// ------

#[derive(Debug, Parser)]
pub struct ListOpts {
    #[clap(value_parser)]
    pub cmd: ListSubCommand,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ListSubCommand {
    Airports,
}

// ------

#[derive(Debug, Parser)]
pub struct ComplOpts {
    #[clap(value_parser)]
    pub shell: Shell,
}
