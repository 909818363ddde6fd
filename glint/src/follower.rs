//! Follower loop.
//!
//! Every follower runs the same shape regardless of engine:
//!
//! ```text
//! barrier -> WAIT_COMMAND -> APPLY_OR_SKIP -> (ACK) -> WAIT_COMMAND
//!                 |
//!                 +-- sentinel --> (ACK) -> EXIT
//! ```
//!
//! Only the acknowledgement policy differs between engines.

use crate::channel::FollowerLink;
use crate::hardware::ChannelDriver;
use glint_core::{Channel, ChannelMask, Level, Result, rate_interval};
use tracing::{debug, trace};

/// Whether the active engine expects an acknowledgement per command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledge {
    Never,
    Always,
}

/// What one follower session did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FollowerReport {
    /// Non-sentinel commands received
    pub commands: u64,
    /// Commands that addressed this follower and were applied
    pub applied: u64,
}

impl std::ops::AddAssign for FollowerReport {
    fn add_assign(&mut self, other: Self) {
        self.commands += other.commands;
        self.applied += other.applied;
    }
}

/// One blink cycle.
///
/// Red, green and blue in turn: on, wait `rate`, off, wait `rate`. There is
/// no wait after blue. Channels outside `mask` are left alone.
pub async fn blink(driver: &mut dyn ChannelDriver, rate: i32, mask: ChannelMask) -> Result<()> {
    let step = rate_interval(rate);
    for channel in mask.channels() {
        driver.set(channel, Level::On)?;
        tokio::time::sleep(step).await;
        driver.set(channel, Level::Off)?;
        if channel != Channel::Blue {
            tokio::time::sleep(step).await;
        }
    }
    Ok(())
}

/// Run one follower session until the sentinel arrives.
pub async fn run_session(
    link: &mut dyn FollowerLink,
    driver: &mut dyn ChannelDriver,
    mask: ChannelMask,
    acknowledge: Acknowledge,
) -> Result<FollowerReport> {
    let rank = link.rank();
    let mut report = FollowerReport::default();

    link.barrier().await?;

    loop {
        let command = link.recv().await?;

        if command.is_sentinel() {
            if acknowledge == Acknowledge::Always {
                link.ack().await?;
            }
            debug!(rank, commands = report.commands, "Follower session finished");
            return Ok(report);
        }

        report.commands += 1;
        if command.selector.addresses(rank) {
            trace!(rank, rate = command.rate, "Applying command");
            blink(driver, command.rate, mask).await?;
            report.applied += 1;
        }

        if acknowledge == Acknowledge::Always {
            link.ack().await?;
        }
    }
}
