//! Raster: row and column scan by rank bitmask.
//!
//! Each selector is broadcast to everyone; only followers whose bit
//! `rank - 1` is set blink. One tick is rows forward, rows back, columns
//! forward, columns back.

use super::EngineContext;
use crate::channel::SharedLink;
use crate::session::{SessionController, SessionParams, SessionState};
use glint_core::{Command, RasterLayout, Result, rate_interval};
use tracing::debug;

pub async fn orchestrate(
    link: &SharedLink,
    layout: RasterLayout,
    ctx: &EngineContext,
    params: SessionParams,
) -> Result<()> {
    let mut session = SessionController::new(params.iterations, ctx.cancel.clone());
    let dwell = rate_interval(params.rate) * ctx.pacing.raster_scan_depth;

    link.barrier().await?;

    loop {
        match session.tick() {
            SessionState::Running => {
                for bits in layout.scan() {
                    debug!(selector = format_args!("{:#010x}", bits), "Raster step");
                    link.broadcast(Command::raster(params.rate, bits)).await?;
                    tokio::time::sleep(dwell).await;
                }
            }
            SessionState::Draining => link.broadcast(Command::raster_sentinel()).await?,
            SessionState::Done => return Ok(()),
        }
    }
}
