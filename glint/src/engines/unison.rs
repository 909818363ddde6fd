//! Unison: every follower blinks at once.

use super::EngineContext;
use crate::channel::SharedLink;
use crate::session::{SessionController, SessionParams, SessionState};
use glint_core::{Command, Result, rate_interval};
use tracing::debug;

pub async fn orchestrate(link: &SharedLink, ctx: &EngineContext, params: SessionParams) -> Result<()> {
    let mut session = SessionController::new(params.iterations, ctx.cancel.clone());
    let dwell = rate_interval(params.rate) * ctx.pacing.unison_dwell;

    link.barrier().await?;

    loop {
        match session.tick() {
            SessionState::Running => {
                debug!(rate = params.rate, "Unison tick");
                link.broadcast(Command::pulse(params.rate)).await?;
                tokio::time::sleep(dwell).await;
            }
            SessionState::Draining => link.broadcast(Command::sentinel()).await?,
            SessionState::Done => return Ok(()),
        }
    }
}
