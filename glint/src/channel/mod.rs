//! Command channel between the orchestrator and its followers.
//!
//! The channel offers exactly three contracts:
//!
//! - **broadcast**: one command to every follower, FIFO per sender, no acknowledgement
//! - **send / receive**: point-to-point, blocking, ordered between a fixed pair
//! - **barrier**: every node waits until all nodes have arrived
//!
//! The orchestrator side is [`OrchestratorLink`], shared behind an `Arc` so
//! concurrent timelines can drive it. Each follower owns one [`FollowerLink`].
//!
//! # Transports
//!
//! - [`local`]: the whole cluster inside one process, over tokio channels
//! - [`tcp`]: one process per node, length-delimited frames over TCP
//! - [`recording`]: decorator that traces orchestrator-side operations

use async_trait::async_trait;
use glint_core::{Command, Rank, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod local;
pub mod recording;
pub mod tcp;

pub use local::{LocalCluster, LocalFollower, LocalOrchestrator};
pub use recording::{LinkEvent, RecordingLink, Trace};
pub use tcp::{TcpFollower, TcpOrchestrator};

/// Session-level announcement used between engines in rotation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// The next engine in the program is about to start
    Begin,
    /// No more engines will run; followers should exit
    Finish,
}

/// Everything that travels over a command channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    /// First frame a follower sends after connecting
    Hello { rank: Rank },
    Command(Command),
    Ack { rank: Rank },
    BarrierArrive { rank: Rank },
    BarrierRelease,
    Notice(Notice),
}

impl Frame {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::Command(_) => "command",
            Self::Ack { .. } => "ack",
            Self::BarrierArrive { .. } => "barrier-arrive",
            Self::BarrierRelease => "barrier-release",
            Self::Notice(_) => "notice",
        }
    }
}

/// Orchestrator side of the command channel.
#[async_trait]
pub trait OrchestratorLink: Send + Sync {
    /// Number of nodes including the orchestrator
    fn cluster_size(&self) -> usize;

    /// Deliver a command to every follower
    async fn broadcast(&self, command: Command) -> Result<()>;

    /// Deliver a command to one follower
    async fn send(&self, target: Rank, command: Command) -> Result<()>;

    /// Wait for the acknowledgement of one follower
    async fn recv_ack(&self, from: Rank) -> Result<()>;

    /// Rendezvous with every follower
    async fn barrier(&self) -> Result<()>;

    /// Announce the next session to every follower
    async fn announce(&self, notice: Notice) -> Result<()>;
}

/// Shared handle to the orchestrator side.
pub type SharedLink = Arc<dyn OrchestratorLink>;

/// Follower side of the command channel.
#[async_trait]
pub trait FollowerLink: Send {
    fn rank(&self) -> Rank;

    /// Wait for the next command from the orchestrator
    async fn recv(&mut self) -> Result<Command>;

    /// Acknowledge the last command
    async fn ack(&mut self) -> Result<()>;

    /// Rendezvous with every other node
    async fn barrier(&mut self) -> Result<()>;

    /// Wait for the next session announcement
    async fn next_notice(&mut self) -> Result<Notice>;
}

/// Check that `rank` names a follower of a cluster of `size` nodes.
pub(crate) fn follower_slot(rank: Rank, size: usize) -> Result<usize> {
    let slot = (rank as usize).wrapping_sub(1);
    if rank == 0 || slot >= size - 1 {
        return Err(glint_core::GlintError::channel(format!(
            "rank {} is not a follower of a {}-node cluster",
            rank, size
        )));
    }
    Ok(slot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follower_slot() {
        assert_eq!(follower_slot(1, 33).unwrap(), 0);
        assert_eq!(follower_slot(32, 33).unwrap(), 31);
        assert!(follower_slot(0, 33).is_err());
        assert!(follower_slot(33, 33).is_err());
    }
}
