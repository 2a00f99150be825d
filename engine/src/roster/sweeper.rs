//! Sweeper actor
//!
//! Periodically evicts AIRBORNE aircraft from the roster.  The plugin does not always send a
//! `CLEAR` once a departure leaves controlled airspace so they would otherwise stay forever.
//!
//! Operations:
//! - Sweep on a timer (set up in `pre_start`)
//! - Sweep right now and reply with the number of evicted aircraft
//! - Report the running total
//!
use std::sync::Arc;
use std::time::Duration;

use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use tracing::{info, trace};

use crate::Roster;

/// The actor itself.
///
pub struct Sweeper;

#[derive(Debug)]
pub enum SweeperMsg {
    /// Timer tick.
    Sweep,
    /// Sweep immediately.
    SweepNow(RpcReplyPort<usize>),
    /// Aircraft evicted since start.
    Total(RpcReplyPort<usize>),
}

#[derive(Debug)]
pub struct SweeperArgs {
    pub roster: Arc<Roster>,
    /// Delay between two sweeps, normally the retention window.
    pub interval: Duration,
}

#[derive(Debug)]
pub struct SweeperState {
    roster: Arc<Roster>,
    total: usize,
}

impl SweeperState {
    fn sweep(&mut self) -> usize {
        let removed = self.roster.sweep();
        self.total += removed;
        removed
    }
}

#[ractor::async_trait]
impl Actor for Sweeper {
    type Msg = SweeperMsg;
    type State = SweeperState;
    type Arguments = SweeperArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        trace!("sweeper::pre_start({:?})", args.interval);

        // A zero period would kill the timer task and no sweep would ever happen again.
        //
        if args.interval.is_zero() {
            return Err(From::from("sweep interval must be non-zero"));
        }

        myself.send_interval(args.interval, || SweeperMsg::Sweep);
        info!("Sweeping AIRBORNE aircraft every {}s", args.interval.as_secs());

        Ok(SweeperState {
            roster: args.roster,
            total: 0,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SweeperMsg::Sweep => {
                trace!("sweeper::sweep");

                state.sweep();
            }
            SweeperMsg::SweepNow(sender) => {
                trace!("sweeper::sweep_now");

                let removed = state.sweep();
                sender.send(removed)?;
            }
            SweeperMsg::Total(sender) => {
                trace!("sweeper::total({})", state.total);

                sender.send(state.total)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Airports, Status, StatusReport};
    use chrono::{TimeDelta, Utc};
    use ractor::call;

    #[tokio::test]
    async fn test_sweeper_now() {
        let roster = Arc::new(Roster::new(
            Airports::from([("EGLL", Some(83))]),
            Duration::from_secs(180),
        ));
        let then = Utc::now() - TimeDelta::seconds(600);
        roster
            .apply_at(StatusReport::new("BAW1", "EGLL", "DEPA"), then)
            .unwrap();
        roster
            .apply_at(StatusReport::new("BAW1", "EGLL", "AIRBORNE"), then)
            .unwrap();
        roster
            .apply_at(StatusReport::new("BAW2", "EGLL", "STUP"), then)
            .unwrap();

        let args = SweeperArgs {
            roster: roster.clone(),
            interval: Duration::from_secs(3600),
        };
        let (actor, handle) = Actor::spawn(None, Sweeper, args).await.unwrap();

        let removed = call!(actor, SweeperMsg::SweepNow).unwrap();
        assert_eq!(1, removed);
        let removed = call!(actor, SweeperMsg::SweepNow).unwrap();
        assert_eq!(0, removed);
        assert_eq!(1, call!(actor, SweeperMsg::Total).unwrap());

        let left = roster.get_by_airport("EGLL");
        assert_eq!(1, left.len());
        assert_eq!(Status::Stup, left[0].status);

        actor.stop(None);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_sweeper_zero_interval() {
        let roster = Roster::new(Airports::from([("EGLL", None)]), Duration::ZERO);
        let args = SweeperArgs {
            roster: Arc::new(roster),
            interval: Duration::ZERO,
        };

        assert!(Actor::spawn(None, Sweeper, args).await.is_err());
    }

    #[tokio::test]
    async fn test_sweeper_timer() {
        let roster = Arc::new(Roster::new(
            Airports::from([("EGLL", None)]),
            Duration::from_secs(1),
        ));
        let then = Utc::now() - TimeDelta::seconds(10);
        roster
            .apply_at(StatusReport::new("BAW1", "EGLL", "TAXI"), then)
            .unwrap();
        roster
            .apply_at(StatusReport::new("BAW1", "EGLL", "AIRBORNE"), then)
            .unwrap();

        let args = SweeperArgs {
            roster: roster.clone(),
            interval: Duration::from_millis(50),
        };
        let (actor, handle) = Actor::spawn(None, Sweeper, args).await.unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(roster.is_empty());
        assert_eq!(1, call!(actor, SweeperMsg::Total).unwrap());

        actor.stop(None);
        handle.await.unwrap();
    }
}
