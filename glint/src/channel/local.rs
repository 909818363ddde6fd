//! In-process cluster over tokio channels.
//!
//! Every follower has one bounded inbound queue that carries both broadcast
//! and point-to-point frames, and one ack queue back to the orchestrator.
//! Bounded queues give the same backpressure a blocking send has: the
//! orchestrator cannot run more than [`QUEUE_DEPTH`] frames ahead of a
//! follower that stopped reading.

use super::{Frame, FollowerLink, Notice, OrchestratorLink, follower_slot};
use async_trait::async_trait;
use glint_core::{Command, GlintError, Rank, Result};
use std::sync::Arc;
use tokio::sync::{Barrier, Mutex, mpsc};

/// Frames a follower may have queued before the sender blocks.
pub const QUEUE_DEPTH: usize = 16;

/// Builder for an in-process cluster.
pub struct LocalCluster;

impl LocalCluster {
    /// Wire up `size` nodes: rank 0 and followers 1..size.
    pub fn new(size: usize) -> Result<(LocalOrchestrator, Vec<LocalFollower>)> {
        if size < 2 {
            return Err(GlintError::config(format!(
                "a cluster needs at least 2 nodes, got {}",
                size
            )));
        }

        let barrier = Arc::new(Barrier::new(size));
        let mut outbound = Vec::with_capacity(size - 1);
        let mut acks = Vec::with_capacity(size - 1);
        let mut followers = Vec::with_capacity(size - 1);

        for rank in 1..size as Rank {
            let (frame_tx, frame_rx) = mpsc::channel(QUEUE_DEPTH);
            let (ack_tx, ack_rx) = mpsc::channel(QUEUE_DEPTH);
            outbound.push(frame_tx);
            acks.push(Mutex::new(ack_rx));
            followers.push(LocalFollower {
                rank,
                inbound: frame_rx,
                acks: ack_tx,
                barrier: barrier.clone(),
            });
        }

        let orchestrator = LocalOrchestrator {
            size,
            outbound,
            acks,
            barrier,
        };
        Ok((orchestrator, followers))
    }
}

/// Rank 0 of an in-process cluster.
pub struct LocalOrchestrator {
    size: usize,
    outbound: Vec<mpsc::Sender<Frame>>,
    acks: Vec<Mutex<mpsc::Receiver<Rank>>>,
    barrier: Arc<Barrier>,
}

impl LocalOrchestrator {
    async fn deliver(&self, slot: usize, frame: Frame) -> Result<()> {
        self.outbound[slot].send(frame).await.map_err(|_| {
            GlintError::channel(format!("follower {} has left the cluster", slot + 1))
        })
    }
}

#[async_trait]
impl OrchestratorLink for LocalOrchestrator {
    fn cluster_size(&self) -> usize {
        self.size
    }

    async fn broadcast(&self, command: Command) -> Result<()> {
        for slot in 0..self.outbound.len() {
            self.deliver(slot, Frame::Command(command)).await?;
        }
        Ok(())
    }

    async fn send(&self, target: Rank, command: Command) -> Result<()> {
        let slot = follower_slot(target, self.size)?;
        self.deliver(slot, Frame::Command(command)).await
    }

    async fn recv_ack(&self, from: Rank) -> Result<()> {
        let slot = follower_slot(from, self.size)?;
        let mut acks = self.acks[slot].lock().await;
        match acks.recv().await {
            Some(rank) if rank == from => Ok(()),
            Some(rank) => Err(GlintError::protocol(format!(
                "expected ack from {}, got one from {}",
                from, rank
            ))),
            None => Err(GlintError::channel(format!(
                "follower {} left before acknowledging",
                from
            ))),
        }
    }

    async fn barrier(&self) -> Result<()> {
        self.barrier.wait().await;
        Ok(())
    }

    async fn announce(&self, notice: Notice) -> Result<()> {
        for slot in 0..self.outbound.len() {
            self.deliver(slot, Frame::Notice(notice)).await?;
        }
        Ok(())
    }
}

/// One follower of an in-process cluster.
pub struct LocalFollower {
    rank: Rank,
    inbound: mpsc::Receiver<Frame>,
    acks: mpsc::Sender<Rank>,
    barrier: Arc<Barrier>,
}

impl LocalFollower {
    async fn next_frame(&mut self) -> Result<Frame> {
        self.inbound
            .recv()
            .await
            .ok_or_else(|| GlintError::channel("orchestrator has left the cluster"))
    }
}

#[async_trait]
impl FollowerLink for LocalFollower {
    fn rank(&self) -> Rank {
        self.rank
    }

    async fn recv(&mut self) -> Result<Command> {
        match self.next_frame().await? {
            Frame::Command(command) => Ok(command),
            other => Err(GlintError::protocol(format!(
                "follower {} expected a command, got {}",
                self.rank,
                other.kind()
            ))),
        }
    }

    async fn ack(&mut self) -> Result<()> {
        self.acks
            .send(self.rank)
            .await
            .map_err(|_| GlintError::channel("orchestrator has left the cluster"))
    }

    async fn barrier(&mut self) -> Result<()> {
        self.barrier.wait().await;
        Ok(())
    }

    async fn next_notice(&mut self) -> Result<Notice> {
        match self.next_frame().await? {
            Frame::Notice(notice) => Ok(notice),
            other => Err(GlintError::protocol(format!(
                "follower {} expected a notice, got {}",
                self.rank,
                other.kind()
            ))),
        }
    }
}
