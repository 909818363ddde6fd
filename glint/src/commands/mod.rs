//! Command handlers for the glint CLI

pub mod follow;
pub mod orchestrate;
pub mod simulate;

pub use follow::follow;
pub use orchestrate::orchestrate;
pub use simulate::simulate;

use crate::engines::EngineContext;
use crate::node::uses_topology;
use glint_core::{GlintConfig, LaunchParams, TopologySet};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Build the engine context for a launch and check the tables fit the cluster.
pub(crate) fn engine_context(
    config: &GlintConfig,
    params: &LaunchParams,
    nodes: usize,
    cancel: CancellationToken,
) -> anyhow::Result<EngineContext> {
    let topology = TopologySet::for_variant(config.cluster().layout);
    if uses_topology(params.mode) {
        topology.validate_for(nodes)?;
    }
    Ok(EngineContext::new(topology, config.patterns().clone(), cancel))
}

pub(crate) fn print_elapsed(elapsed: Duration) {
    println!("Elapsed: {:.3}s", elapsed.as_secs_f64());
}
