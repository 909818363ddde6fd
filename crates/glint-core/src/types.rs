//! Command vocabulary shared by the orchestrator and its followers.

use crate::error::{GlintError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Position of a node in the cluster. Rank 0 is always the orchestrator.
pub type Rank = u32;

/// Rank of the session controller.
pub const ORCHESTRATOR: Rank = 0;

/// Reserved rate telling a follower to leave its loop.
pub const SENTINEL_RATE: i32 = -1;

/// Widest rank bitmask a raster command can carry.
pub const MAX_BITMASK_RANK: Rank = 32;

// ============================================================================
// Output channels
// ============================================================================

/// One of the three independent outputs every node drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    /// All channels in blink order.
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    /// Bit this channel occupies in a [`ChannelMask`].
    pub fn bit(self) -> u8 {
        match self {
            Self::Red => 0x1,
            Self::Green => 0x2,
            Self::Blue => 0x4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical state of an output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    On,
    Off,
}

impl Level {
    pub fn inverted(self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
        }
    }

    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

// ============================================================================
// Channel mask
// ============================================================================

/// Three-bit set selecting which outputs a follower drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ChannelMask(u8);

impl ChannelMask {
    pub const NONE: ChannelMask = ChannelMask(0);
    pub const RED: ChannelMask = ChannelMask(0x1);
    pub const GREEN: ChannelMask = ChannelMask(0x2);
    pub const BLUE: ChannelMask = ChannelMask(0x4);
    pub const ALL: ChannelMask = ChannelMask(0x7);

    /// Build a mask from raw bits, rejecting anything above bit 2.
    pub fn new(bits: u8) -> Result<Self> {
        if bits & !Self::ALL.0 != 0 {
            return Err(GlintError::config(format!(
                "Channel mask {:#x} has bits outside 0x7",
                bits
            )));
        }
        Ok(Self(bits))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, channel: Channel) -> bool {
        self.0 & channel.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Channels selected by this mask, in blink order.
    pub fn channels(self) -> impl Iterator<Item = Channel> {
        Channel::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl Default for ChannelMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl TryFrom<u8> for ChannelMask {
    type Error = GlintError;

    fn try_from(bits: u8) -> Result<Self> {
        Self::new(bits)
    }
}

impl From<ChannelMask> for u8 {
    fn from(mask: ChannelMask) -> u8 {
        mask.0
    }
}

impl fmt::Display for ChannelMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.channels().map(Channel::as_str).collect();
        f.write_str(&names.join("+"))
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Which followers a command applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selector {
    /// Every receiver applies its own locally configured mask.
    OwnMask,
    /// Only followers whose bit `rank - 1` is set apply their mask.
    Ranks(u32),
}

impl Selector {
    /// Whether a follower with this rank should act on the command.
    pub fn addresses(self, rank: Rank) -> bool {
        match self {
            Self::OwnMask => true,
            Self::Ranks(bits) => {
                (1..=MAX_BITMASK_RANK).contains(&rank) && bits & (1u32 << (rank - 1)) != 0
            }
        }
    }
}

/// The single payload the orchestrator ever sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Command {
    /// Step length in milliseconds; negative means terminate.
    pub rate: i32,
    pub selector: Selector,
}

impl Command {
    /// A step for every receiver at the given rate.
    pub fn pulse(rate: i32) -> Self {
        Self {
            rate,
            selector: Selector::OwnMask,
        }
    }

    /// A step only for the ranks selected by `bits`.
    pub fn raster(rate: i32, bits: u32) -> Self {
        Self {
            rate,
            selector: Selector::Ranks(bits),
        }
    }

    /// The terminal sentinel.
    pub fn sentinel() -> Self {
        Self::pulse(SENTINEL_RATE)
    }

    /// The terminal sentinel in raster form, addressed to nobody.
    pub fn raster_sentinel() -> Self {
        Self::raster(SENTINEL_RATE, 0)
    }

    pub fn is_sentinel(&self) -> bool {
        self.rate < 0
    }

    /// Length of one blink step, zero for the sentinel.
    pub fn step(&self) -> Duration {
        rate_interval(self.rate)
    }
}

/// Convert a millisecond rate into a sleep duration; non-positive rates map to zero.
pub fn rate_interval(rate: i32) -> Duration {
    Duration::from_millis(u64::try_from(rate).unwrap_or(0))
}
