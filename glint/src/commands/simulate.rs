//! `glint simulate`: a whole cluster inside one process.

use super::{engine_context, print_elapsed};
use crate::channel::{LocalCluster, RecordingLink, SharedLink, Trace};
use crate::hardware::MemoryDriver;
use crate::node::{run_follower, run_orchestrator};
use crate::shutdown::ShutdownCoordinator;
use anyhow::{Context, Result};
use glint_core::{Channel, GlintConfig, LaunchParams};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::info;

/// Run a simulated cluster with in-memory outputs.
pub async fn simulate(
    config: &GlintConfig,
    params: LaunchParams,
    nodes: Option<usize>,
    trace: bool,
) -> Result<()> {
    let size = nodes.unwrap_or(config.cluster().size);
    let shutdown = ShutdownCoordinator::new();
    let ctx = engine_context(config, &params, size, shutdown.token())?;
    let signals = shutdown.listen();

    let (orchestrator, followers) = LocalCluster::new(size)?;
    // Only a traced run keeps its link history.
    let (link, events): (SharedLink, Option<Trace>) = if trace {
        let recording = RecordingLink::new(orchestrator);
        let events = recording.trace();
        (Arc::new(recording), Some(events))
    } else {
        (Arc::new(orchestrator), None)
    };

    info!(nodes = size, "Simulating cluster");

    let mut drivers = Vec::with_capacity(followers.len());
    let mut tasks = Vec::with_capacity(followers.len());
    for mut follower in followers {
        let handle = MemoryDriver::counting();
        let mut driver = handle.clone();
        drivers.push(handle);
        tasks.push(tokio::spawn(async move {
            run_follower(&mut follower, &mut driver, &params).await
        }));
    }

    let started = Instant::now();
    let mut controller = MemoryDriver::counting();
    let outcome = run_orchestrator(link, &mut controller, &ctx, &params).await;
    let elapsed = started.elapsed();

    if outcome.is_err() {
        for task in &tasks {
            task.abort();
        }
    }
    signals.abort();
    outcome?;

    println!("{:>5} {:>9} {:>8} {:>5} {:>6} {:>5}", "rank", "commands", "applied", "red", "green", "blue");
    for (index, (task, driver)) in tasks.into_iter().zip(&drivers).enumerate() {
        let rank = index + 1;
        let report = task
            .await
            .with_context(|| format!("follower {} panicked", rank))??;
        println!(
            "{:>5} {:>9} {:>8} {:>5} {:>6} {:>5}",
            rank,
            report.commands,
            report.applied,
            driver.pulses(Channel::Red),
            driver.pulses(Channel::Green),
            driver.pulses(Channel::Blue),
        );
    }

    if let Some(events) = events {
        for event in events.events() {
            println!("{:?}", event);
        }
    }

    print_elapsed(elapsed);
    Ok(())
}
