//! Mode selector table.
//!
//! The numeric selector given at launch maps onto an engine and, for the
//! table-driven engines, the table it walks:
//!
//! | selector | engine                                   |
//! |----------|------------------------------------------|
//! | 0-5      | sweep over stack-up .. zigzag            |
//! | 6-11     | sweep-broadcast over stack-up .. zigzag  |
//! | 12       | unison                                   |
//! | 13       | dual-sweep over outer/inner circle       |
//! | 14       | raster                                   |
//! | other    | rotation through every engine            |

use crate::topology::PatternId;
use std::fmt;

/// Tables addressable by selectors 0-5 and 6-11, in selector order.
pub const SWEEP_TABLES: [PatternId; 6] = [
    PatternId::StackUp,
    PatternId::StackDown,
    PatternId::LeftRight,
    PatternId::RightLeft,
    PatternId::Spiral,
    PatternId::Zigzag,
];

/// What a node runs for one launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Handshaked chase, one follower at a time
    Sweep(PatternId),
    /// Timed strobe without acknowledgements
    SweepBroadcast(PatternId),
    /// Everyone at once
    Unison,
    /// Two concurrent strobes over disjoint tables
    DualSweep { outer: PatternId, inner: PatternId },
    /// Row/column scan by bitmask
    Raster,
    /// Every engine in turn until interrupted
    Rotation,
}

impl Mode {
    /// Resolve a launch selector. Anything outside 0-14, or nothing, is rotation.
    pub fn from_selector(selector: Option<i64>) -> Self {
        match selector {
            Some(n @ 0..=5) => Self::Sweep(SWEEP_TABLES[n as usize]),
            Some(n @ 6..=11) => Self::SweepBroadcast(SWEEP_TABLES[(n - 6) as usize]),
            Some(12) => Self::Unison,
            Some(13) => Self::DualSweep {
                outer: PatternId::OuterCircle,
                inner: PatternId::InnerCircleCcw,
            },
            Some(14) => Self::Raster,
            _ => Self::Rotation,
        }
    }

    /// Selector that maps back onto this mode, if it has one.
    pub fn selector(&self) -> Option<u8> {
        let index = |id: &PatternId| SWEEP_TABLES.iter().position(|t| t == id);
        match self {
            Self::Sweep(id) => index(id).map(|i| i as u8),
            Self::SweepBroadcast(id) => index(id).map(|i| i as u8 + 6),
            Self::Unison => Some(12),
            Self::DualSweep { .. } => Some(13),
            Self::Raster => Some(14),
            Self::Rotation => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sweep(id) => write!(f, "sweep({})", id),
            Self::SweepBroadcast(id) => write!(f, "sweep-broadcast({})", id),
            Self::Unison => f.write_str("unison"),
            Self::DualSweep { outer, inner } => write!(f, "dual-sweep({}, {})", outer, inner),
            Self::Raster => f.write_str("raster"),
            Self::Rotation => f.write_str("rotation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_table() {
        assert_eq!(Mode::from_selector(Some(0)), Mode::Sweep(PatternId::StackUp));
        assert_eq!(Mode::from_selector(Some(5)), Mode::Sweep(PatternId::Zigzag));
        assert_eq!(
            Mode::from_selector(Some(6)),
            Mode::SweepBroadcast(PatternId::StackUp)
        );
        assert_eq!(
            Mode::from_selector(Some(10)),
            Mode::SweepBroadcast(PatternId::Spiral)
        );
        assert_eq!(Mode::from_selector(Some(12)), Mode::Unison);
        assert_eq!(Mode::from_selector(Some(14)), Mode::Raster);
        assert_eq!(Mode::from_selector(Some(15)), Mode::Rotation);
        assert_eq!(Mode::from_selector(Some(-3)), Mode::Rotation);
        assert_eq!(Mode::from_selector(None), Mode::Rotation);
    }

    #[test]
    fn test_selector_round_trip_for_fixed_modes() {
        for n in 0..=14u8 {
            assert_eq!(Mode::from_selector(Some(n as i64)).selector(), Some(n));
        }
        assert_eq!(Mode::Rotation.selector(), None);
    }
}
