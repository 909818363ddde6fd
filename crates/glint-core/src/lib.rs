//! Core types and tables for the glint cluster light engine.
//!
//! This crate holds everything that both sides of a glint cluster agree on
//! without talking to each other: the command vocabulary, channel masks,
//! the physical topology tables, the mode selector table and the
//! configuration document.

pub mod config;
pub mod error;
pub mod mode;
pub mod topology;
pub mod types;

pub use config::{GlintConfig, LaunchParams};
pub use error::{GlintError, Result};
pub use mode::Mode;
pub use topology::{LayoutVariant, PatternId, PatternTable, RasterLayout, TopologySet};
pub use types::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{GlintConfig, LaunchParams};
    pub use crate::error::{GlintError, Result};
    pub use crate::mode::Mode;
    pub use crate::topology::{LayoutVariant, PatternId, PatternTable, RasterLayout, TopologySet};
    pub use crate::types::*;
}
