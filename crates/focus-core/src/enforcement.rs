//! Enforcement loop
//!
//! Coarse-grained periodic task: while a session is active, every
//! restricted app is sent a termination request and one focus minute is
//! credited per tick.

use chrono::{DateTime, Local};
use focus_api::RestrictionSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{EngineContext, EngineEvent, is_session_active};

/// Outcome of one termination pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub attempted: usize,
    pub failed: usize,
}

/// Request termination of every identifier in `restricted`
///
/// A failure for one identifier does not stop the rest.
pub(crate) async fn sweep_restricted(
    ctx: &EngineContext,
    restricted: &RestrictionSet,
) -> SweepReport {
    let mut report = SweepReport::default();
    for id in restricted.iter() {
        report.attempted += 1;
        if ctx.host.kill(id).await.is_err() {
            report.failed += 1;
        }
    }

    if report.attempted > 0 {
        debug!(
            attempted = report.attempted,
            failed = report.failed,
            "Termination sweep finished"
        );
        ctx.emit(EngineEvent::TerminationSweep {
            attempted: report.attempted,
            failed: report.failed,
        });
    }
    report
}

/// What a single enforcement tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcementOutcome {
    /// No session; nothing was touched
    Idle,
    Enforced {
        sweep: SweepReport,
        focus_minutes: u32,
    },
}

pub struct EnforcementLoop {
    ctx: Arc<EngineContext>,
    last_session: Option<bool>,
}

impl EnforcementLoop {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self {
            ctx,
            last_session: None,
        }
    }

    pub async fn tick(&mut self, now: DateTime<Local>) -> EnforcementOutcome {
        let planner = self.ctx.planner.snapshot();
        let active = is_session_active(&planner, self.ctx.debug.is_enabled(), &now);

        if self.last_session != Some(active) {
            if self.last_session.is_some() {
                info!(active, "Focus session changed");
            }
            self.last_session = Some(active);
            self.ctx.emit(EngineEvent::SessionChanged { active });
        }

        if !active {
            return EnforcementOutcome::Idle;
        }

        let sweep = sweep_restricted(&self.ctx, &planner.restricted).await;

        let day = now.date_naive();
        let focus_minutes = match self.ctx.counter.credit(day) {
            Some(minutes) => {
                self.ctx.emit(EngineEvent::FocusMinute { day, minutes });
                minutes
            }
            None => self.ctx.counter.minutes_on(day),
        };

        EnforcementOutcome::Enforced {
            sweep,
            focus_minutes,
        }
    }

    /// Tick every `period` until `cancel` fires
    pub async fn run(mut self, period: Duration, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!(period_secs = period.as_secs(), "Enforcement loop started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.tick(focus_util::now()).await;
                }
            }
        }
        debug!("Enforcement loop stopped");
    }
}
