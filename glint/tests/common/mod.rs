//! Common test utilities for glint tests
//!
//! [`Harness`] wires a whole in-process cluster: a recording orchestrator
//! link, one spawned follower task per rank and an in-memory driver handle
//! for every follower.

#![allow(dead_code)]

use glint::channel::{LinkEvent, LocalCluster, RecordingLink, SharedLink, Trace};
use glint::engines::EngineContext;
use glint::follower::FollowerReport;
use glint::hardware::MemoryDriver;
use glint::node::{run_follower, run_orchestrator};
use glint_core::config::PatternConfig;
use glint_core::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Nodes in a full cluster.
pub const FULL_CLUSTER: usize = 33;

pub struct Harness {
    pub link: SharedLink,
    pub trace: Trace,
    pub drivers: Vec<MemoryDriver>,
    pub controller: MemoryDriver,
    pub cancel: CancellationToken,
    pub params: LaunchParams,
    followers: Vec<JoinHandle<Result<FollowerReport>>>,
}

impl Harness {
    /// Build a cluster of `size` nodes and start every follower.
    pub fn launch(size: usize, params: LaunchParams) -> Self {
        let (orchestrator, followers) = LocalCluster::new(size).unwrap();
        let recording = RecordingLink::new(orchestrator);
        let trace = recording.trace();

        let mut drivers = Vec::new();
        let mut tasks = Vec::new();
        for mut follower in followers {
            let handle = MemoryDriver::new();
            let mut driver = handle.clone();
            drivers.push(handle);
            tasks.push(tokio::spawn(async move {
                run_follower(&mut follower, &mut driver, &params).await
            }));
        }

        Self {
            link: Arc::new(recording),
            trace,
            drivers,
            controller: MemoryDriver::new(),
            cancel: CancellationToken::new(),
            params,
            followers: tasks,
        }
    }

    pub fn context(&self) -> EngineContext {
        EngineContext::new(
            TopologySet::for_variant(LayoutVariant::Network),
            PatternConfig::default(),
            self.cancel.clone(),
        )
    }

    /// Run the orchestrator side to completion.
    pub async fn orchestrate(&self) -> Result<()> {
        let mut controller = self.controller.clone();
        run_orchestrator(self.link.clone(), &mut controller, &self.context(), &self.params).await
    }

    /// Run the orchestrator in the background.
    pub fn spawn_orchestrator(&self) -> JoinHandle<Result<()>> {
        let link = self.link.clone();
        let ctx = self.context();
        let params = self.params;
        let mut controller = self.controller.clone();
        tokio::spawn(async move { run_orchestrator(link, &mut controller, &ctx, &params).await })
    }

    /// Wait for every follower to exit and collect their reports.
    pub async fn join(&mut self) -> Vec<FollowerReport> {
        let mut reports = Vec::new();
        for task in self.followers.drain(..) {
            reports.push(task.await.unwrap().unwrap());
        }
        reports
    }
}

pub fn params(mode: Mode, rate: i32, iterations: i64, mask: ChannelMask) -> LaunchParams {
    LaunchParams {
        rate,
        mode,
        iterations,
        mask,
    }
}

/// How many sentinels each follower rank was sent, directly or by broadcast.
pub fn sentinels_per_rank(events: &[LinkEvent], size: usize) -> BTreeMap<Rank, usize> {
    let mut counts: BTreeMap<Rank, usize> = (1..size as Rank).map(|r| (r, 0)).collect();
    for event in events {
        match event {
            LinkEvent::Broadcast(c) if c.is_sentinel() => {
                counts.values_mut().for_each(|n| *n += 1);
            }
            LinkEvent::Send { to, command } if command.is_sentinel() => {
                *counts.entry(*to).or_default() += 1;
            }
            _ => {}
        }
    }
    counts
}

/// Every point-to-point send in the trace, in order.
pub fn sends(events: &[LinkEvent]) -> Vec<(Rank, Command)> {
    events
        .iter()
        .filter_map(|e| match e {
            LinkEvent::Send { to, command } => Some((*to, *command)),
            _ => None,
        })
        .collect()
}
