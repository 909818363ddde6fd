//! Sweep-broadcast (strobe): a timed sweep without handshakes.
//!
//! Each follower in the table gets a command and the orchestrator moves on
//! after one `rate` interval without waiting for it. The active table may
//! skip followers, so termination always walks the canonical table instead.

use super::EngineContext;
use crate::channel::SharedLink;
use crate::session::{SessionController, SessionParams, SessionState};
use glint_core::{Command, PatternTable, Result, rate_interval};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Send the sentinel to every follower of `canonical`.
pub async fn terminate(link: &SharedLink, canonical: PatternTable) -> Result<()> {
    for &rank in canonical.ranks() {
        link.send(rank, Command::sentinel()).await?;
    }
    Ok(())
}

/// One strobe timeline, without the opening barrier.
///
/// With `termination` set the timeline sends the sentinel itself when it
/// drains; otherwise it just stops and the caller terminates.
pub async fn timeline(
    link: &SharedLink,
    table: PatternTable,
    rate: i32,
    iterations: i64,
    cancel: CancellationToken,
    termination: Option<PatternTable>,
) -> Result<()> {
    let mut session = SessionController::new(iterations, cancel);
    let step = rate_interval(rate);

    loop {
        match session.tick() {
            SessionState::Running => {
                debug!(table = %table.id(), rate, "Strobe tick");
                for &rank in table.ranks() {
                    link.send(rank, Command::pulse(rate)).await?;
                    tokio::time::sleep(step).await;
                }
            }
            SessionState::Draining => {
                if let Some(canonical) = termination {
                    terminate(link, canonical).await?;
                }
            }
            SessionState::Done => return Ok(()),
        }
    }
}

pub async fn orchestrate(
    link: &SharedLink,
    table: PatternTable,
    ctx: &EngineContext,
    params: SessionParams,
) -> Result<()> {
    link.barrier().await?;
    timeline(
        link,
        table,
        params.rate,
        params.iterations,
        ctx.cancel.clone(),
        Some(ctx.topology.canonical()),
    )
    .await
}
