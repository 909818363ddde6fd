//! Topology tables for the 32-follower cluster.
//!
//! A cluster is a stack of four-wide boards, eight boards high. The same
//! boards can be numbered in two ways depending on how the ranks were handed
//! out, so every table exists in two named sets:
//!
//! - **network**: ranks follow the switch cabling, four per row
//! - **physical**: ranks follow the chassis, eight per column
//!
//! Each set carries the visitation orders used by the sweep engines and the
//! row/column bit selectors used by the raster engine. Tables are `'static`
//! and never change at runtime.

use crate::error::{GlintError, Result};
use crate::types::Rank;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which numbering of the cluster the tables describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutVariant {
    #[default]
    Network,
    Physical,
}

impl LayoutVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Physical => "physical",
        }
    }
}

impl FromStr for LayoutVariant {
    type Err = GlintError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "network" => Ok(Self::Network),
            "physical" => Ok(Self::Physical),
            _ => Err(GlintError::config(format!(
                "Invalid layout '{}'. Must be one of: network, physical",
                s
            ))),
        }
    }
}

impl fmt::Display for LayoutVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of a visitation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternId {
    StackUp,
    StackDown,
    LeftRight,
    RightLeft,
    Spiral,
    Zigzag,
    OuterCircle,
    InnerCircleCcw,
    InnerCircleCw,
}

impl PatternId {
    pub const ALL: [PatternId; 9] = [
        PatternId::StackUp,
        PatternId::StackDown,
        PatternId::LeftRight,
        PatternId::RightLeft,
        PatternId::Spiral,
        PatternId::Zigzag,
        PatternId::OuterCircle,
        PatternId::InnerCircleCcw,
        PatternId::InnerCircleCw,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StackUp => "stack-up",
            Self::StackDown => "stack-down",
            Self::LeftRight => "left-right",
            Self::RightLeft => "right-left",
            Self::Spiral => "spiral",
            Self::Zigzag => "zigzag",
            Self::OuterCircle => "outer-circle",
            Self::InnerCircleCcw => "inner-circle-ccw",
            Self::InnerCircleCw => "inner-circle-cw",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, ordered list of follower ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternTable {
    id: PatternId,
    ranks: &'static [Rank],
}

impl PatternTable {
    pub fn id(&self) -> PatternId {
        self.id
    }

    pub fn ranks(&self) -> &'static [Rank] {
        self.ranks
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// Highest rank the table visits.
    pub fn max_rank(&self) -> Rank {
        self.ranks.iter().copied().max().unwrap_or(0)
    }
}

/// Row and column selectors for the raster engine.
///
/// Each selector is a bitmask over follower ranks: bit `rank - 1` set means
/// the follower lights up when that selector is broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterLayout {
    rows: &'static [u32],
    columns: &'static [u32],
}

impl RasterLayout {
    pub fn rows(&self) -> &'static [u32] {
        self.rows
    }

    pub fn columns(&self) -> &'static [u32] {
        self.columns
    }

    /// One raster pass: rows forward, rows back, columns forward, columns back.
    pub fn scan(&self) -> impl Iterator<Item = u32> + 'static {
        let rows = self.rows;
        let columns = self.columns;
        rows.iter()
            .chain(rows.iter().rev())
            .chain(columns.iter())
            .chain(columns.iter().rev())
            .copied()
    }

    /// Union of every selector in the pass.
    pub fn coverage(&self) -> u32 {
        self.scan().fold(0, |acc, bits| acc | bits)
    }
}

/// Every table for one layout variant.
#[derive(Debug)]
pub struct TopologySet {
    variant: LayoutVariant,
    tables: [&'static [Rank]; 9],
    raster: RasterLayout,
}

impl TopologySet {
    /// Look up the table set for a layout.
    pub fn for_variant(variant: LayoutVariant) -> &'static TopologySet {
        match variant {
            LayoutVariant::Network => &NETWORK,
            LayoutVariant::Physical => &PHYSICAL,
        }
    }

    pub fn variant(&self) -> LayoutVariant {
        self.variant
    }

    pub fn table(&self, id: PatternId) -> PatternTable {
        PatternTable {
            id,
            ranks: self.tables[id.index()],
        }
    }

    /// The stack-order table used to reach every follower on termination.
    pub fn canonical(&self) -> PatternTable {
        self.table(PatternId::StackUp)
    }

    pub fn raster(&self) -> RasterLayout {
        self.raster
    }

    /// Highest rank named anywhere in the set.
    pub fn max_rank(&self) -> Rank {
        let tables = PatternId::ALL.iter().map(|id| self.table(*id).max_rank());
        let raster = 32 - self.raster.coverage().leading_zeros();
        tables.max().unwrap_or(0).max(raster)
    }

    /// Check that every table only names followers of a cluster of `size` nodes.
    pub fn validate_for(&self, size: usize) -> Result<()> {
        for id in PatternId::ALL {
            let table = self.table(id);
            if let Some(rank) = table
                .ranks()
                .iter()
                .copied()
                .find(|r| *r == 0 || *r as usize >= size)
            {
                return Err(GlintError::Topology {
                    table: format!("{}/{}", self.variant, id),
                    rank,
                    size,
                });
            }
        }

        let highest = 32 - self.raster.coverage().leading_zeros();
        if highest as usize >= size {
            return Err(GlintError::Topology {
                table: format!("{}/raster", self.variant),
                rank: highest,
                size,
            });
        }
        Ok(())
    }
}

// ============================================================================
// Network layout
// ============================================================================

static NETWORK: TopologySet = TopologySet {
    variant: LayoutVariant::Network,
    tables: [
        &[
            29, 25, 21, 17, 13, 9, 5, 1, 30, 26, 22, 18, 14, 10, 6, 2, 31, 27, 23, 19, 15, 11, 7,
            3, 32, 28, 24, 20, 16, 12, 8, 4,
        ],
        &[
            1, 5, 9, 13, 17, 21, 25, 29, 2, 6, 10, 14, 18, 22, 26, 30, 3, 7, 11, 15, 19, 23, 27,
            31, 4, 8, 12, 16, 20, 24, 28, 32,
        ],
        &[
            1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
            25, 26, 27, 28, 29, 30, 31, 32,
        ],
        &[
            4, 3, 2, 1, 8, 7, 6, 5, 12, 11, 10, 9, 16, 15, 14, 13, 20, 19, 18, 17, 24, 23, 22, 21,
            28, 27, 26, 25, 32, 31, 30, 29,
        ],
        &[
            1, 2, 3, 4, 8, 12, 16, 20, 24, 28, 32, 31, 30, 29, 25, 21, 17, 13, 9, 5, 6, 7, 11, 15,
            19, 23, 27, 26, 22, 18, 14, 10, 11, 15, 19, 18, 14, 15, 19, 18,
        ],
        &[
            1, 2, 3, 4, 8, 7, 6, 5, 9, 10, 11, 12, 16, 15, 14, 13, 17, 18, 19, 20, 24, 23, 22, 21,
            25, 26, 27, 28, 32, 31, 30, 29,
        ],
        &[
            29, 25, 21, 17, 13, 9, 5, 1, 2, 3, 4, 8, 12, 16, 20, 24, 28, 32, 31, 30,
        ],
        &[7, 6, 10, 14, 18, 22, 26, 27, 23, 19, 15, 11],
        &[7, 11, 15, 19, 23, 27, 26, 22, 18, 14, 10, 6],
    ],
    raster: RasterLayout {
        rows: &[
            0x0000_000F,
            0x0000_00F0,
            0x0000_0F00,
            0x0000_F000,
            0x000F_0000,
            0x00F0_0000,
            0x0F00_0000,
            0xF000_0000,
        ],
        columns: &[0x1111_1111, 0x2222_2222, 0x4444_4444, 0x8888_8888],
    },
};

// ============================================================================
// Physical layout
// ============================================================================

static PHYSICAL: TopologySet = TopologySet {
    variant: LayoutVariant::Physical,
    tables: [
        &[
            1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
            25, 26, 27, 28, 29, 30, 31, 32,
        ],
        &[
            8, 7, 6, 5, 4, 3, 2, 1, 16, 15, 14, 13, 12, 11, 10, 9, 24, 23, 22, 21, 20, 19, 18, 17,
            32, 31, 30, 29, 28, 27, 26, 25,
        ],
        &[
            8, 16, 24, 32, 7, 15, 23, 31, 6, 14, 22, 30, 5, 13, 21, 29, 4, 12, 20, 28, 3, 11, 19,
            27, 2, 10, 18, 26, 1, 9, 17, 25,
        ],
        &[
            32, 24, 16, 8, 31, 23, 15, 7, 30, 22, 14, 6, 29, 21, 13, 5, 28, 20, 12, 4, 27, 19, 11,
            3, 26, 18, 10, 2, 25, 17, 9, 1,
        ],
        &[
            8, 16, 24, 32, 31, 30, 29, 28, 27, 26, 25, 17, 9, 1, 2, 3, 4, 5, 6, 7, 15, 23, 22, 21,
            20, 19, 18, 10, 11, 12, 13, 14, 22, 21, 20, 12, 13, 21, 20, 12,
        ],
        &[
            8, 16, 24, 32, 31, 23, 15, 7, 6, 14, 22, 30, 29, 21, 13, 5, 4, 12, 20, 28, 27, 19, 11,
            3, 2, 10, 18, 26, 25, 17, 9, 1,
        ],
        &[
            1, 2, 3, 4, 5, 6, 7, 8, 16, 24, 32, 31, 30, 29, 28, 27, 26, 25, 17, 9,
        ],
        &[23, 15, 14, 13, 12, 11, 10, 18, 19, 20, 21, 22],
        &[23, 22, 21, 20, 19, 18, 10, 11, 12, 13, 14, 15],
    ],
    raster: RasterLayout {
        rows: &[
            0x0101_0101,
            0x0202_0202,
            0x0404_0404,
            0x0808_0808,
            0x1010_1010,
            0x2020_2020,
            0x4040_4040,
            0x8080_8080,
        ],
        columns: &[0x0000_00FF, 0x0000_FF00, 0x00FF_0000, 0xFF00_0000],
    },
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lengths() {
        for variant in [LayoutVariant::Network, LayoutVariant::Physical] {
            let set = TopologySet::for_variant(variant);
            assert_eq!(set.table(PatternId::StackUp).len(), 32);
            assert_eq!(set.table(PatternId::Spiral).len(), 40);
            assert_eq!(set.table(PatternId::OuterCircle).len(), 20);
            assert_eq!(set.table(PatternId::InnerCircleCcw).len(), 12);
            assert_eq!(set.raster().rows().len(), 8);
            assert_eq!(set.raster().columns().len(), 4);
        }
    }

    #[test]
    fn test_canonical_is_stack_up() {
        let set = TopologySet::for_variant(LayoutVariant::Network);
        assert_eq!(set.canonical().id(), PatternId::StackUp);
        assert_eq!(set.canonical().ranks()[0], 29);
    }

    #[test]
    fn test_scan_order() {
        let raster = TopologySet::for_variant(LayoutVariant::Network).raster();
        let scan: Vec<u32> = raster.scan().collect();
        assert_eq!(scan.len(), 24);
        assert_eq!(scan[0], 0x0000_000F);
        assert_eq!(scan[7], 0xF000_0000);
        assert_eq!(scan[8], 0xF000_0000);
        assert_eq!(scan[15], 0x0000_000F);
        assert_eq!(scan[16], 0x1111_1111);
        assert_eq!(scan[23], 0x1111_1111);
    }

    #[test]
    fn test_validate_for_small_cluster() {
        let set = TopologySet::for_variant(LayoutVariant::Physical);
        assert!(set.validate_for(33).is_ok());
        let err = set.validate_for(16).unwrap_err();
        assert!(err.is_topology());
    }

    #[test]
    fn test_layout_parse() {
        assert_eq!("Physical".parse::<LayoutVariant>().unwrap(), LayoutVariant::Physical);
        assert!("diagonal".parse::<LayoutVariant>().is_err());
    }
}
