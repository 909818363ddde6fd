//! Tracing decorator for the orchestrator side.

use super::{Notice, OrchestratorLink};
use async_trait::async_trait;
use glint_core::{Command, Rank, Result};
use parking_lot::Mutex;
use std::sync::Arc;

/// One completed orchestrator-side operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Barrier,
    Broadcast(Command),
    Send { to: Rank, command: Command },
    Ack { from: Rank },
    Announce(Notice),
}

/// Shared, append-only list of link events.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    events: Arc<Mutex<Vec<LinkEvent>>>,
}

impl Trace {
    pub fn events(&self) -> Vec<LinkEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Number of sentinel commands in the trace, broadcast or sent.
    pub fn sentinels(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| match e {
                LinkEvent::Broadcast(c) | LinkEvent::Send { command: c, .. } => c.is_sentinel(),
                _ => false,
            })
            .count()
    }

    fn push(&self, event: LinkEvent) {
        self.events.lock().push(event);
    }
}

/// Wraps an orchestrator link and records every operation once it completes.
pub struct RecordingLink<L> {
    inner: L,
    trace: Trace,
}

impl<L: OrchestratorLink> RecordingLink<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            trace: Trace::default(),
        }
    }

    /// Handle to the trace that stays valid after the link is shared.
    pub fn trace(&self) -> Trace {
        self.trace.clone()
    }
}

#[async_trait]
impl<L: OrchestratorLink> OrchestratorLink for RecordingLink<L> {
    fn cluster_size(&self) -> usize {
        self.inner.cluster_size()
    }

    async fn broadcast(&self, command: Command) -> Result<()> {
        self.inner.broadcast(command).await?;
        self.trace.push(LinkEvent::Broadcast(command));
        Ok(())
    }

    async fn send(&self, target: Rank, command: Command) -> Result<()> {
        self.inner.send(target, command).await?;
        self.trace.push(LinkEvent::Send {
            to: target,
            command,
        });
        Ok(())
    }

    async fn recv_ack(&self, from: Rank) -> Result<()> {
        self.inner.recv_ack(from).await?;
        self.trace.push(LinkEvent::Ack { from });
        Ok(())
    }

    async fn barrier(&self) -> Result<()> {
        self.inner.barrier().await?;
        self.trace.push(LinkEvent::Barrier);
        Ok(())
    }

    async fn announce(&self, notice: Notice) -> Result<()> {
        self.inner.announce(notice).await?;
        self.trace.push(LinkEvent::Announce(notice));
        Ok(())
    }
}
