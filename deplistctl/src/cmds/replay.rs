//! This is the module handling the `replay` and `run` sub-commands.
//!
//! Both read status reports, one JSON object per line, and apply them to a fresh roster.  A
//! bad line is logged and skipped, it never stops the stream.
//!

use std::fs;
use std::sync::Arc;

use eyre::{eyre, Result};
use ractor::{call, Actor};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, trace, warn};

use deplist_engine::{Config, Outcome, Roster, StatusReport, Sweeper, SweeperArgs, SweeperMsg};

use crate::ReplayOpts;

/// Parse and apply one line.
///
pub fn apply_line(roster: &Roster, line: &str) -> Result<Outcome> {
    let report: StatusReport = serde_json::from_str(line)?;
    Ok(roster.apply(report)?)
}

fn log_outcome(n: usize, res: Result<Outcome>) {
    match res {
        Ok(outcome) if outcome.success() => debug!("line {n}: {outcome:?}"),
        Ok(outcome) => warn!(
            "line {n}: ignored, {}",
            outcome.reason().unwrap_or_default()
        ),
        Err(e) => error!("line {n}: rejected, {e}"),
    }
}

/// Apply every report in the file, in order.
///
#[tracing::instrument(skip(cfg))]
pub fn replay_file(cfg: &Config, ropts: &ReplayOpts) -> Result<Roster> {
    trace!("replay_file({:?})", ropts.file);

    let roster = Roster::from(cfg);
    let data = fs::read_to_string(&ropts.file)?;

    data.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .for_each(|(n, line)| log_outcome(n + 1, apply_line(&roster, line)));

    info!("{} aircraft on the board", roster.len());
    Ok(roster)
}

/// Long-running mode: apply reports from `stdin` until EOF while the sweeper evicts departed
/// aircraft on its own schedule.
///
#[tracing::instrument(skip(cfg))]
pub async fn run_stdin(cfg: &Config) -> Result<Arc<Roster>> {
    trace!("run_stdin");

    let roster = Arc::new(Roster::from(cfg));
    let args = SweeperArgs {
        roster: Arc::clone(&roster),
        interval: cfg.retention(),
    };
    let (sweeper, handle) = Actor::spawn(Some("sweeper".to_string()), Sweeper, args)
        .await
        .map_err(|e| eyre!("can not start sweeper: {e}"))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut n = 0;
    while let Some(line) = lines.next_line().await? {
        n += 1;
        if line.trim().is_empty() {
            continue;
        }
        log_outcome(n, apply_line(&roster, &line));
    }

    let total = call!(sweeper, SweeperMsg::Total).map_err(|e| eyre!("sweeper: {e}"))?;
    info!("EOF after {n} lines, sweeper evicted {total} aircraft");

    sweeper.stop(None);
    handle.await?;

    Ok(roster)
}
