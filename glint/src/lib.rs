//! Glint - synchronised light patterns across a cluster of boards
//!
//! One node (rank 0) orchestrates; every other node follows, driving a red,
//! a green and a blue output. The orchestrator sequences commands over a
//! command channel offering ordered broadcast, blocking point-to-point
//! messages and a whole-cluster barrier.
//!
//! # Architecture
//!
//! - `channel` - command channel traits and the local, TCP and recording transports
//! - `hardware` - output drivers (in-memory and sysfs GPIO)
//! - `session` - countdown/cancellation state machine with a one-shot drain
//! - `engines` - unison, sweep, sweep-broadcast, dual-sweep and raster
//! - `follower` - the generic follower loop and the blink cycle
//! - `rotation` - every engine in turn until interrupted
//! - `node` - per-node entry points that always leave outputs off
//! - `shutdown` - SIGINT/SIGTERM handling
//! - `commands` - CLI command handlers

pub mod channel;
pub mod commands;
pub mod engines;
pub mod follower;
pub mod hardware;
pub mod node;
pub mod rotation;
pub mod session;
pub mod shutdown;

pub use channel::{FollowerLink, OrchestratorLink, SharedLink};
pub use engines::EngineContext;
pub use follower::FollowerReport;
pub use hardware::ChannelDriver;
pub use session::{SessionController, SessionParams, SessionState};

/// Glint version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
