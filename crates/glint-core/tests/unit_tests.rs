//! Unit tests for glint-core

use glint_core::prelude::*;
use glint_core::mode::SWEEP_TABLES;
use proptest::prelude::*;
use std::collections::HashSet;

const VARIANTS: [LayoutVariant; 2] = [LayoutVariant::Network, LayoutVariant::Physical];

// ============================================================================
// Error Tests
// ============================================================================

#[test]
fn test_error_display() {
    let err = GlintError::config("bad rate");
    assert_eq!(format!("{}", err), "Configuration error: bad rate");

    let err = GlintError::Topology {
        table: "network/spiral".to_string(),
        rank: 40,
        size: 33,
    };
    assert_eq!(
        format!("{}", err),
        "Topology error: network/spiral names rank 40, cluster has 33 nodes"
    );
}

#[test]
fn test_error_predicates() {
    assert!(GlintError::hardware("gpio").is_hardware());
    assert!(GlintError::channel("closed").is_channel());
    assert!(GlintError::protocol("unexpected").is_protocol());
    assert!(!GlintError::protocol("unexpected").is_config());
}

#[test]
fn test_error_from_io() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let err: GlintError = io_err.into();
    assert!(matches!(err, GlintError::Io(_)));
}

// ============================================================================
// Topology Tests
// ============================================================================

#[test]
fn test_every_table_fits_a_full_cluster() {
    for variant in VARIANTS {
        let set = TopologySet::for_variant(variant);
        assert!(set.validate_for(33).is_ok());
        assert_eq!(set.max_rank(), 32);
    }
}

#[test]
fn test_canonical_table_reaches_every_follower_once() {
    for variant in VARIANTS {
        let canonical = TopologySet::for_variant(variant).canonical();
        let unique: HashSet<Rank> = canonical.ranks().iter().copied().collect();
        assert_eq!(unique.len(), 32);
        assert_eq!(canonical.len(), 32);
        assert!(unique.iter().all(|r| (1..=32).contains(r)));
    }
}

#[test]
fn test_raster_pass_addresses_every_follower() {
    for variant in VARIANTS {
        let raster = TopologySet::for_variant(variant).raster();
        assert_eq!(raster.coverage(), u32::MAX);

        let rows = raster.rows().iter().fold(0, |acc, r| acc | r);
        let columns = raster.columns().iter().fold(0, |acc, c| acc | c);
        assert_eq!(rows, u32::MAX);
        assert_eq!(columns, u32::MAX);
    }
}

#[test]
fn test_dual_sweep_tables_are_disjoint() {
    for variant in VARIANTS {
        let set = TopologySet::for_variant(variant);
        let outer: HashSet<Rank> = set.table(PatternId::OuterCircle).ranks().iter().copied().collect();
        for inner_id in [PatternId::InnerCircleCcw, PatternId::InnerCircleCw] {
            let inner: HashSet<Rank> = set.table(inner_id).ranks().iter().copied().collect();
            assert!(outer.is_disjoint(&inner), "{}: outer and {} overlap", variant, inner_id);
        }
    }
}

#[test]
fn test_sweep_tables_cover_selector_range() {
    let set = TopologySet::for_variant(LayoutVariant::Network);
    for (i, id) in SWEEP_TABLES.iter().enumerate() {
        assert_eq!(Mode::from_selector(Some(i as i64)), Mode::Sweep(*id));
        assert!(!set.table(*id).is_empty());
    }
}

proptest! {
    #[test]
    fn prop_raster_selector_matches_rank_bit(bits in any::<u32>(), rank in 1u32..=32) {
        let cmd = Command::raster(10, bits);
        prop_assert_eq!(cmd.selector.addresses(rank), bits & (1 << (rank - 1)) != 0);
    }

    #[test]
    fn prop_mask_accepts_exactly_three_bits(bits in any::<u8>()) {
        let mask = ChannelMask::new(bits);
        prop_assert_eq!(mask.is_ok(), bits <= 7);
        if let Ok(mask) = mask {
            let rebuilt = mask.channels().fold(0u8, |acc, c| acc | c.bit());
            prop_assert_eq!(rebuilt, bits);
        }
    }

    #[test]
    fn prop_small_clusters_are_rejected(size in 2usize..33) {
        for variant in VARIANTS {
            prop_assert!(TopologySet::for_variant(variant).validate_for(size).is_err());
        }
    }
}

// ============================================================================
// Serialization Tests
// ============================================================================

#[test]
fn test_command_json_shape() {
    let json = serde_json::to_value(Command::raster(25, 0xF)).unwrap();
    assert_eq!(json["rate"], 25);
    assert_eq!(json["selector"]["Ranks"], 15);

    let mask: ChannelMask = serde_json::from_str("5").unwrap();
    assert_eq!(mask.bits(), 5);
    assert!(serde_json::from_str::<ChannelMask>("9").is_err());
}
