//! Error types for glint.

/// Result type alias for glint operations.
pub type Result<T> = std::result::Result<T, GlintError>;

/// Main error type for glint.
#[derive(Debug, thiserror::Error)]
pub enum GlintError {
    /// Invalid launch parameter or configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Output driver could not be initialised or written
    #[error("Hardware error: {0}")]
    Hardware(String),

    /// Command channel failure (peer gone, queue closed)
    #[error("Channel error: {0}")]
    Channel(String),

    /// A peer sent a frame the protocol does not allow at this point
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A topology table names a rank the cluster does not have
    #[error("Topology error: {table} names rank {rank}, cluster has {size} nodes")]
    Topology {
        table: String,
        rank: u32,
        size: usize,
    },

    /// Frame encoding/decoding errors
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped anyhow errors for compatibility
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GlintError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new hardware error
    pub fn hardware(msg: impl Into<String>) -> Self {
        Self::Hardware(msg.into())
    }

    /// Create a new channel error
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }

    /// Create a new protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a new encoding error
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is a hardware error
    pub fn is_hardware(&self) -> bool {
        matches!(self, Self::Hardware(_))
    }

    /// Check if this is a channel error
    pub fn is_channel(&self) -> bool {
        matches!(self, Self::Channel(_))
    }

    /// Check if this is a protocol error
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }

    /// Check if this is a topology error
    pub fn is_topology(&self) -> bool {
        matches!(self, Self::Topology { .. })
    }
}
