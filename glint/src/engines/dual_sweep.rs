//! Dual-sweep (multistrobe): two strobe timelines at once.
//!
//! The outer timeline walks its table at the session rate and starts right
//! after the barrier. The inner one walks a disjoint table at
//! `rate * dual_sweep_inner_scale` and starts one `rate` later. The two tasks
//! share nothing mutable; only the link handle, which is safe for concurrent
//! use.
//!
//! Neither timeline terminates the followers. Once both are joined the
//! engine sends exactly one sentinel per follower over the canonical table.

use super::EngineContext;
use super::strobe::{terminate, timeline};
use crate::channel::SharedLink;
use crate::session::SessionParams;
use anyhow::Context;
use glint_core::{PatternTable, Result, rate_interval};
use tracing::debug;

pub async fn orchestrate(
    link: &SharedLink,
    outer: PatternTable,
    inner: PatternTable,
    ctx: &EngineContext,
    params: SessionParams,
) -> Result<()> {
    let stagger = rate_interval(params.rate);
    let inner_rate = params
        .rate
        .saturating_mul(ctx.pacing.dual_sweep_inner_scale.min(i32::MAX as u32) as i32);

    link.barrier().await?;

    let outer_task = tokio::spawn({
        let link = link.clone();
        let cancel = ctx.cancel.clone();
        async move { timeline(&link, outer, params.rate, params.iterations, cancel, None).await }
    });

    let inner_task = tokio::spawn({
        let link = link.clone();
        let cancel = ctx.cancel.clone();
        async move {
            tokio::time::sleep(stagger).await;
            timeline(&link, inner, inner_rate, params.iterations, cancel, None).await
        }
    });

    let (outer_done, inner_done) = tokio::join!(outer_task, inner_task);
    outer_done.context("outer timeline panicked")??;
    inner_done.context("inner timeline panicked")??;
    debug!("Both timelines joined");

    terminate(link, ctx.topology.canonical()).await
}
