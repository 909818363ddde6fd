//! `glint follow`: one follower over TCP.

use crate::channel::TcpFollower;
use crate::hardware;
use crate::node::run_follower;
use crate::shutdown::{self, ShutdownCoordinator};
use anyhow::Result;
use glint_core::{GlintConfig, LaunchParams, Rank};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Join the cluster as `rank` and follow until the sentinel arrives.
pub async fn follow(
    config: &GlintConfig,
    params: LaunchParams,
    rank: Rank,
    connect: Option<String>,
) -> Result<()> {
    let connect = connect.unwrap_or_else(|| config.transport().connect.clone());
    let patience = Duration::from_secs(config.transport().join_timeout_secs);

    let mut driver = hardware::open(config.hardware())?;
    let mut link = TcpFollower::connect_with_retry(&connect, rank, patience).await?;

    let stop = CancellationToken::new();
    let signals = ShutdownCoordinator::log_only(stop.clone());
    let outcome = run_follower(&mut link, driver.as_mut(), &params).await;
    stop.cancel();
    shutdown::join_listener(signals).await;

    let report = outcome?;
    println!(
        "Follower {}: {} commands, {} applied",
        rank, report.commands, report.applied
    );
    Ok(())
}
