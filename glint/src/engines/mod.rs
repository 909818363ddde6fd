//! Pattern engines.
//!
//! Each engine is a pair of state machines sharing one protocol over the
//! command channel: an orchestrator side driven by a
//! [`SessionController`](crate::session::SessionController), and a follower
//! side that is always the generic [`follower::run_session`] loop with the
//! engine's acknowledgement policy.
//!
//! | engine          | orchestrator traffic                | acks |
//! |-----------------|-------------------------------------|------|
//! | unison          | broadcast                           | no   |
//! | sweep           | send + wait for ack, table order    | yes  |
//! | sweep-broadcast | send, then wait `rate`, table order | no   |
//! | dual-sweep      | two sweep-broadcasts at once        | no   |
//! | raster          | broadcast with a rank bitmask       | no   |
//!
//! Every engine starts with a barrier over the whole cluster.

use crate::channel::{FollowerLink, SharedLink};
use crate::follower::{self, Acknowledge, FollowerReport};
use crate::hardware::ChannelDriver;
use crate::session::SessionParams;
use glint_core::config::PatternConfig;
use glint_core::{ChannelMask, Mode, Result, TopologySet};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub mod dual_sweep;
pub mod raster;
pub mod strobe;
pub mod sweep;
pub mod unison;

/// Everything an orchestrator-side engine needs besides its parameters.
#[derive(Debug, Clone)]
pub struct EngineContext {
    pub topology: &'static TopologySet,
    pub pacing: PatternConfig,
    /// Cancelled by an external interrupt; polled once per tick
    pub cancel: CancellationToken,
}

impl EngineContext {
    pub fn new(topology: &'static TopologySet, pacing: PatternConfig, cancel: CancellationToken) -> Self {
        Self {
            topology,
            pacing,
            cancel,
        }
    }
}

/// Run one orchestrator-side session of a fixed-engine mode.
///
/// Rotation is not an engine; see [`crate::rotation`].
pub async fn orchestrate(
    mode: Mode,
    link: &SharedLink,
    ctx: &EngineContext,
    params: SessionParams,
) -> Result<()> {
    info!(%mode, rate = params.rate, iterations = params.iterations, "Starting session");
    let topology = ctx.topology;

    match mode {
        Mode::Unison => unison::orchestrate(link, ctx, params).await,
        Mode::Sweep(id) => sweep::orchestrate(link, topology.table(id), ctx, params).await,
        Mode::SweepBroadcast(id) => strobe::orchestrate(link, topology.table(id), ctx, params).await,
        Mode::DualSweep { outer, inner } => {
            dual_sweep::orchestrate(link, topology.table(outer), topology.table(inner), ctx, params)
                .await
        }
        Mode::Raster => raster::orchestrate(link, topology.raster(), ctx, params).await,
        Mode::Rotation => Err(glint_core::GlintError::config(
            "rotation is a program of sessions, not a single engine",
        )),
    }
}

/// Acknowledgement policy of a mode's follower loop.
pub fn acknowledge(mode: Mode) -> Acknowledge {
    match mode {
        Mode::Sweep(_) => Acknowledge::Always,
        _ => Acknowledge::Never,
    }
}

/// Run one follower-side session of a fixed-engine mode.
pub async fn follow(
    mode: Mode,
    link: &mut dyn FollowerLink,
    driver: &mut dyn ChannelDriver,
    mask: ChannelMask,
) -> Result<FollowerReport> {
    follower::run_session(link, driver, mask, acknowledge(mode)).await
}
