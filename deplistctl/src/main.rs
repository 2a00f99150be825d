use std::io;

use clap::{crate_authors, crate_description, crate_version, CommandFactory, Parser};
use clap_complete::generate;
use eyre::Result;
use tracing::{info, trace};

use deplist_common::{init_logging, ConfigFile};
use deplist_engine::{Config, TAG};
use deplistctl::{
    decode_metar, fetch_weather, replay_file, run_stdin, ListSubCommand, Opts, SubCommand,
};

/// Binary name, using a different binary name
pub const NAME: &str = env!("CARGO_BIN_NAME");
/// Binary version
pub const VERSION: &str = crate_version!();
/// Authors
pub const AUTHORS: &str = crate_authors!();

fn main() -> Result<()> {
    let opts = Opts::parse();

    // Initialise logging early
    //
    init_logging(NAME, opts.debug, opts.log_dir.clone())?;

    // Explicit file must exist, otherwise the default one is optional.
    //
    let cfg = ConfigFile::<Config>::load(TAG, opts.config.as_deref())?.into_inner();

    // Banner
    //
    banner()?;

    handle_subcmd(&cfg, &opts.subcmd)
}

pub fn handle_subcmd(cfg: &Config, subcmd: &SubCommand) -> Result<()> {
    match subcmd {
        // Handle `decode [-a ICAO] [-e FEET] RAW`
        //
        SubCommand::Decode(dopts) => {
            trace!("decode");

            let json = decode_metar(cfg, dopts)?;
            println!("{json}");
        }

        // Handle `weather ICAO...`
        //
        SubCommand::Weather(wopts) => {
            trace!("weather");

            fetch_weather(cfg, wopts)?;
        }

        // Handle `replay FILE`
        //
        SubCommand::Replay(ropts) => {
            trace!("replay");

            let roster = replay_file(cfg, ropts)?;
            println!("{}", roster.list());
        }

        // Handle `run`, the only place where we need an async runtime.
        //
        SubCommand::Run => {
            trace!("run");

            let rt = tokio::runtime::Runtime::new()?;
            let roster = rt.block_on(run_stdin(cfg))?;
            println!("{}", roster.list());
        }

        // Standalone completion generation
        //
        // NOTE: you can generate UNIX shells completion on Windows and vice-versa.  Not worth
        //       trying to limit depending on the OS.
        //
        SubCommand::Completion(copts) => {
            let generator = copts.shell;
            generate(generator, &mut Opts::command(), NAME, &mut io::stdout());
        }

        // Standalone `list` command
        //
        SubCommand::List(lopts) => match lopts.cmd {
            ListSubCommand::Airports => {
                info!("Listing all airports:");

                println!("{}", cfg.airports().list());
            }
        },

        // Standalone `version` command
        //
        SubCommand::Version => {
            eprintln!("Modules: ");
            eprintln!("\t{}", deplist_common::version());
            eprintln!("\t{}", deplist_engine::version());
        }
    }
    Ok(())
}

/// Display banner
///
fn banner() -> Result<()> {
    Ok(eprintln!(
        r##"
{}/{} by {}
{}
"##,
        NAME,
        VERSION,
        AUTHORS,
        crate_description!()
    ))
}
