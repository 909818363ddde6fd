//! `glint orchestrate`: rank 0 over TCP.

use super::{engine_context, print_elapsed};
use crate::channel::{SharedLink, TcpOrchestrator};
use crate::hardware;
use crate::node::run_orchestrator;
use crate::shutdown::ShutdownCoordinator;
use anyhow::Result;
use glint_core::{GlintConfig, LaunchParams};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// Wait for the cluster to form, then run the launch.
pub async fn orchestrate(
    config: &GlintConfig,
    params: LaunchParams,
    bind: Option<String>,
    nodes: Option<usize>,
) -> Result<()> {
    let size = nodes.unwrap_or(config.cluster().size);
    let bind = bind.unwrap_or_else(|| config.transport().bind.clone());
    let join_timeout = Duration::from_secs(config.transport().join_timeout_secs);

    let shutdown = ShutdownCoordinator::new();
    let ctx = engine_context(config, &params, size, shutdown.token())?;
    let mut driver = hardware::open(config.hardware())?;
    let signals = shutdown.listen();

    let token = shutdown.token();
    let link = tokio::select! {
        link = TcpOrchestrator::bind(bind.as_str(), size, join_timeout) => link?,
        _ = token.cancelled() => {
            info!("Interrupted before the cluster formed");
            driver.all_off()?;
            return Ok(());
        }
    };
    let link: SharedLink = Arc::new(link);

    let started = Instant::now();
    let outcome = run_orchestrator(link, driver.as_mut(), &ctx, &params).await;
    signals.abort();
    outcome?;

    print_elapsed(started.elapsed());
    Ok(())
}
