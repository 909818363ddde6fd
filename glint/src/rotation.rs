//! Rotation: every engine in turn until interrupted.
//!
//! Both sides walk the same deterministic [`Program`], so followers know
//! which engine comes next without being told. Before each engine the
//! orchestrator announces [`Notice::Begin`]; when it stops it announces
//! [`Notice::Finish`]. A follower therefore never waits at the barrier of an
//! engine that will not run.
//!
//! One pass of the program is:
//!
//! 1. sweep over stack-up
//! 2. sweep-broadcast over stack-up, stack-down, left-right, right-left, spiral
//! 3. unison with red, green, blue, then every channel, at 7x the budget
//! 4. raster at half the rate
//!
//! The pass mask (used by 1, 2 and 4) starts as the configured mask and then
//! cycles red, green, blue, configured.

use crate::channel::{FollowerLink, Notice, SharedLink};
use crate::engines::{self, EngineContext};
use crate::follower::FollowerReport;
use crate::hardware::ChannelDriver;
use crate::session::SessionParams;
use glint_core::{ChannelMask, LaunchParams, Mode, PatternId, Result};
use tracing::{debug, info};

/// Budget multiplier for the unison sessions of a pass.
const UNISON_BUDGET_FACTOR: i64 = 7;

const STROBE_TABLES: [PatternId; 5] = [
    PatternId::StackUp,
    PatternId::StackDown,
    PatternId::LeftRight,
    PatternId::RightLeft,
    PatternId::Spiral,
];

const UNISON_MASKS: [ChannelMask; 4] = [
    ChannelMask::RED,
    ChannelMask::GREEN,
    ChannelMask::BLUE,
    ChannelMask::ALL,
];

/// Endless sequence of `(mode, session)` steps.
#[derive(Debug, Clone)]
pub struct Program {
    rate: i32,
    iterations: i64,
    configured: ChannelMask,
    pass_mask: ChannelMask,
    /// Passes completed, modulo the mask cycle
    pass: usize,
    pending: std::vec::IntoIter<(Mode, SessionParams)>,
}

impl Program {
    pub fn new(params: &LaunchParams) -> Self {
        let mut program = Self {
            rate: params.rate,
            iterations: params.iterations,
            configured: params.mask,
            pass_mask: params.mask,
            pass: 0,
            pending: Vec::new().into_iter(),
        };
        program.pending = program.pass_steps().into_iter();
        program
    }

    fn pass_steps(&self) -> Vec<(Mode, SessionParams)> {
        let session = |rate, mask, iterations| SessionParams {
            rate,
            mask,
            iterations,
        };
        let base = session(self.rate, self.pass_mask, self.iterations);

        let mut steps = vec![(Mode::Sweep(PatternId::StackUp), base)];
        steps.extend(STROBE_TABLES.iter().map(|id| (Mode::SweepBroadcast(*id), base)));
        steps.extend(UNISON_MASKS.iter().map(|mask| {
            let budget = self.iterations.saturating_mul(UNISON_BUDGET_FACTOR);
            (Mode::Unison, session(self.rate, *mask, budget))
        }));
        steps.push((
            Mode::Raster,
            session((self.rate / 2).max(1), self.pass_mask, self.iterations),
        ));
        steps
    }

    fn next_pass(&mut self) {
        self.pass_mask = match self.pass {
            0 => ChannelMask::RED,
            1 => ChannelMask::GREEN,
            2 => ChannelMask::BLUE,
            _ => self.configured,
        };
        self.pass = (self.pass + 1) % 4;
        self.pending = self.pass_steps().into_iter();
    }
}

impl Iterator for Program {
    type Item = (Mode, SessionParams);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(step) = self.pending.next() {
            return Some(step);
        }
        self.next_pass();
        self.pending.next()
    }
}

/// Orchestrator side: run steps until the token is cancelled.
pub async fn orchestrate(link: &SharedLink, ctx: &EngineContext, params: &LaunchParams) -> Result<()> {
    info!("Running every engine in rotation");
    let mut sessions = 0u64;

    for (mode, session) in Program::new(params) {
        if ctx.cancel.is_cancelled() {
            break;
        }
        link.announce(Notice::Begin).await?;
        engines::orchestrate(mode, link, ctx, session).await?;
        sessions += 1;
    }

    link.announce(Notice::Finish).await?;
    info!(sessions, "Rotation finished");
    Ok(())
}

/// Follower side: follow announced steps until told to finish.
pub async fn follow(
    link: &mut dyn FollowerLink,
    driver: &mut dyn ChannelDriver,
    params: &LaunchParams,
) -> Result<FollowerReport> {
    let mut program = Program::new(params);
    let mut report = FollowerReport::default();

    loop {
        match link.next_notice().await? {
            Notice::Finish => return Ok(report),
            Notice::Begin => {
                let Some((mode, session)) = program.next() else {
                    return Ok(report);
                };
                debug!(rank = link.rank(), %mode, mask = %session.mask, "Following next engine");
                report += engines::follow(mode, link, driver, session.mask).await?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(mask: ChannelMask) -> LaunchParams {
        LaunchParams {
            rate: 40,
            mode: Mode::Rotation,
            iterations: 2,
            mask,
        }
    }

    #[test]
    fn test_pass_layout() {
        let steps: Vec<_> = Program::new(&params(ChannelMask::ALL)).take(11).collect();

        assert_eq!(steps[0].0, Mode::Sweep(PatternId::StackUp));
        assert_eq!(steps[5].0, Mode::SweepBroadcast(PatternId::Spiral));
        assert_eq!(steps[6].0, Mode::Unison);
        assert_eq!(steps[6].1.mask, ChannelMask::RED);
        assert_eq!(steps[6].1.iterations, 14);
        assert_eq!(steps[9].1.mask, ChannelMask::ALL);
        assert_eq!(steps[10].0, Mode::Raster);
        assert_eq!(steps[10].1.rate, 20);
    }

    #[test]
    fn test_pass_mask_cycle() {
        let configured = ChannelMask::new(0b101).unwrap();
        let pass_masks: Vec<_> = Program::new(&params(configured))
            .step_by(11)
            .take(6)
            .map(|(_, session)| session.mask)
            .collect();

        assert_eq!(
            pass_masks,
            vec![
                configured,
                ChannelMask::RED,
                ChannelMask::GREEN,
                ChannelMask::BLUE,
                configured,
                ChannelMask::RED,
            ]
        );
    }

    #[test]
    fn test_unbounded_budget_stays_unbounded() {
        let mut p = params(ChannelMask::ALL);
        p.iterations = -1;
        let unison = Program::new(&p).nth(6).unwrap();
        assert!(unison.1.iterations < 0);
    }

    #[test]
    fn test_raster_rate_never_reaches_zero() {
        let mut p = params(ChannelMask::ALL);
        p.rate = 1;
        let raster = Program::new(&p).nth(10).unwrap();
        assert_eq!(raster.1.rate, 1);
    }
}
