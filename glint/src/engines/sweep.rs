//! Sweep (chase): one follower at a time, handshaked.
//!
//! Every send waits for the same follower's acknowledgement before moving on,
//! so the lit position travels strictly in table order at whatever pace the
//! followers manage. Termination walks the same table, again with acks, but
//! reaches each follower only once: a spiral revisits some ranks, and a
//! follower that already left would never acknowledge a second sentinel.

use super::EngineContext;
use crate::channel::SharedLink;
use crate::session::{SessionController, SessionParams, SessionState};
use glint_core::{Command, PatternTable, Result};
use std::collections::HashSet;
use tracing::debug;

async fn traverse(link: &SharedLink, table: PatternTable, command: Command) -> Result<()> {
    for &rank in table.ranks() {
        link.send(rank, command).await?;
        link.recv_ack(rank).await?;
    }
    Ok(())
}

async fn terminate(link: &SharedLink, table: PatternTable) -> Result<()> {
    let mut reached = HashSet::new();
    for &rank in table.ranks() {
        if reached.insert(rank) {
            link.send(rank, Command::sentinel()).await?;
            link.recv_ack(rank).await?;
        }
    }
    Ok(())
}

pub async fn orchestrate(
    link: &SharedLink,
    table: PatternTable,
    ctx: &EngineContext,
    params: SessionParams,
) -> Result<()> {
    let mut session = SessionController::new(params.iterations, ctx.cancel.clone());

    link.barrier().await?;

    loop {
        match session.tick() {
            SessionState::Running => {
                debug!(table = %table.id(), "Sweep tick");
                traverse(link, table, Command::pulse(params.rate)).await?;
            }
            SessionState::Draining => terminate(link, table).await?,
            SessionState::Done => return Ok(()),
        }
    }
}
