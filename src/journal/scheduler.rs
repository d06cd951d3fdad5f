//! Cron-driven ticks that fire the daily sweeps at their configured hours.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use cron::Schedule;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::journal::debounce::Debouncer;
use crate::journal::sweeps::{SweepReport, Sweeper};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepKind {
    Remind,
    Summarize,
}

/// UTC hours at which each sweep runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepHours {
    pub remind: u32,
    pub summarize: u32,
}

/// Which sweep, if any, a tick at `tick` should run.
pub fn sweep_for_hour(tick: DateTime<Utc>, hours: SweepHours) -> Option<SweepKind> {
    let hour = tick.hour();
    if hour == hours.remind {
        Some(SweepKind::Remind)
    } else if hour == hours.summarize {
        Some(SweepKind::Summarize)
    } else {
        None
    }
}

/// Run the sweep selected by `tick`'s hour.
pub async fn dispatch(sweeper: &Sweeper, hours: SweepHours, tick: DateTime<Utc>) -> Option<SweepReport> {
    let kind = sweep_for_hour(tick, hours)?;
    info!("Tick {} runs {:?} sweep", tick, kind);

    let result = match kind {
        SweepKind::Remind => sweeper.remind_daily(tick).await,
        SweepKind::Summarize => sweeper.summarize_daily(tick).await,
    };

    match result {
        Ok(report) => Some(report),
        Err(e) => {
            error!("{:?} sweep failed to list users: {}", kind, e);
            None
        }
    }
}

pub struct Scheduler {
    schedule: Schedule,
    debounce: Duration,
    hours: SweepHours,
    sweeper: Arc<Sweeper>,
}

impl Scheduler {
    pub fn new(schedule: Schedule, debounce: Duration, hours: SweepHours, sweeper: Arc<Sweeper>) -> Self {
        Self { schedule, debounce, hours, sweeper }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Sleep until each cron occurrence and feed it through the debouncer, so a
    /// burst of ticks (e.g. after a clock jump) runs one sweep.
    async fn run(self) {
        let sweeper = self.sweeper.clone();
        let hours = self.hours;
        let debouncer = Debouncer::new(self.debounce, move |tick: DateTime<Utc>| {
            let sweeper = sweeper.clone();
            tokio::spawn(async move {
                dispatch(&sweeper, hours, tick).await;
            });
        });

        info!(
            "Scheduler started (remind at {:02}:00 UTC, summarize at {:02}:00 UTC)",
            hours.remind, hours.summarize
        );

        loop {
            let Some(next) = self.schedule.after(&Utc::now()).next() else {
                warn!("Tick schedule has no future occurrence, scheduler stopping");
                break;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            sleep(wait).await;

            debug!("Tick {}", next);
            debouncer.trigger(next).await;
        }
    }
}
