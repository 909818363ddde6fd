//! Node entry points.
//!
//! [`run_orchestrator`] and [`run_follower`] wrap a whole launch on one
//! node: pick the engine (or rotation) for the launch mode, run it, and force
//! every channel off on the way out, whether the session succeeded or not.

use crate::channel::{FollowerLink, SharedLink};
use crate::engines::{self, EngineContext};
use crate::follower::FollowerReport;
use crate::hardware::ChannelDriver;
use crate::rotation;
use crate::session::SessionParams;
use glint_core::{LaunchParams, Mode, Result};
use tracing::{info, warn};

/// Whether a mode addresses followers through the topology tables.
pub(crate) fn uses_topology(mode: Mode) -> bool {
    !matches!(mode, Mode::Unison)
}

fn settle<T>(outcome: Result<T>, driver: &mut dyn ChannelDriver) -> Result<T> {
    let cleared = driver.all_off();
    if let (Err(e), Err(_)) = (&cleared, &outcome) {
        warn!("Failed to switch outputs off: {}", e);
    }
    let value = outcome?;
    cleared?;
    Ok(value)
}

/// Run a launch as rank 0.
pub async fn run_orchestrator(
    link: SharedLink,
    driver: &mut dyn ChannelDriver,
    ctx: &EngineContext,
    params: &LaunchParams,
) -> Result<()> {
    info!(
        mode = %params.mode,
        selector = ?params.mode.selector(),
        rate = params.rate,
        iterations = params.iterations,
        unbounded = params.is_unbounded(),
        mask = %params.mask,
        nodes = link.cluster_size(),
        layout = %ctx.topology.variant(),
        "Orchestrating"
    );

    let outcome = async {
        if uses_topology(params.mode) {
            ctx.topology.validate_for(link.cluster_size())?;
        }
        match params.mode {
            Mode::Rotation => rotation::orchestrate(&link, ctx, params).await,
            mode => engines::orchestrate(mode, &link, ctx, SessionParams::from(params)).await,
        }
    }
    .await;

    settle(outcome, driver)
}

/// Run a launch as a follower.
pub async fn run_follower(
    link: &mut dyn FollowerLink,
    driver: &mut dyn ChannelDriver,
    params: &LaunchParams,
) -> Result<FollowerReport> {
    let rank = link.rank();
    let outcome = match params.mode {
        Mode::Rotation => rotation::follow(link, driver, params).await,
        mode => engines::follow(mode, link, driver, params.mask).await,
    };

    if let Ok(report) = &outcome {
        info!(rank, commands = report.commands, applied = report.applied, "Follower exiting");
    }
    settle(outcome, driver)
}
