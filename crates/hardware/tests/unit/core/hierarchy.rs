//! Cache Hierarchy Tests.
//!
//! Routing by core, penalty selection, L3 ownership release on L2 eviction
//! and back-invalidation for inclusion.

use proptest::prelude::*;

use sharpsim_core::common::SimError;
use sharpsim_core::config::Config;
use sharpsim_core::core::CacheHierarchy;

use crate::common::{config_with, hierarchy, init_tracing, tiny_config, tiny_l2, tiny_l3};

/// Every valid L2 line is also valid in L3.
fn assert_inclusive(h: &CacheHierarchy) {
    let g = *h.l2().geometry();
    for set in 0..g.sets {
        for way in h.l2().set(set).unwrap().iter().filter(|w| w.valid) {
            let line = g.line_address(way.tag, set);
            assert!(h.l3().contains(line), "L2 line {line:#x} missing from L3");
        }
    }
}

// ══════════════════════════════════════════════════════════
// 1. Routing
// ══════════════════════════════════════════════════════════

#[test]
fn victim_miss_fills_both_levels() {
    let mut h = hierarchy(&Config::default());
    let r = h.access(0x4014e3, 0).unwrap();
    assert!(r.missed());
    assert_eq!(r.penalty, 100);
    assert!(r.l2.unwrap().miss);
    assert!(r.l3.unwrap().miss);
    assert!(h.l2().contains(0x4014c0));
    assert_eq!(h.l3().peek(0x4014c0).unwrap().owner, Some(0));
}

#[test]
fn victim_l2_hit_skips_l3() {
    let mut h = hierarchy(&Config::default());
    let _ = h.access(0x4014e3, 0).unwrap();
    let r = h.access(0x4014e0, 0).unwrap();
    assert_eq!(r.penalty, 1);
    assert!(r.l3.is_none());
    assert!(!r.missed());
    assert_eq!(h.l3().accesses(), 1);
}

#[test]
fn attacker_bypasses_l2() {
    let mut h = hierarchy(&Config::default());
    let r = h.access(0x4016dc, 3).unwrap();
    assert!(r.l2.is_none());
    assert_eq!(r.penalty, 100);
    assert_eq!(h.l2().accesses(), 0);
    assert_eq!(h.l3().peek(0x4016dc).unwrap().owner, Some(3));

    let again = h.access(0x4016dc, 3).unwrap();
    assert_eq!(again.penalty, 1);
}

#[test]
fn unknown_core_is_rejected() {
    let mut h = hierarchy(&Config::default());
    assert_eq!(h.cores(), 5);
    assert_eq!(
        h.access(0, 5).unwrap_err(),
        SimError::UnknownCore { core: 5, cores: 5 }
    );
    assert_eq!(h.l3().accesses(), 0);
}

// ══════════════════════════════════════════════════════════
// 2. Ownership release
// ══════════════════════════════════════════════════════════

#[test]
fn l2_eviction_frees_l3_owner() {
    let mut h = hierarchy(&Config::default());
    // Lines one L2 stride apart share an L2 set but not an L3 set.
    let stride = h.l2().geometry().set_stride();
    for k in 0..4 {
        let _ = h.access(k * stride, 0).unwrap();
    }
    assert_eq!(h.l3().peek(0).unwrap().owner, Some(0));

    let r = h.access(4 * stride, 0).unwrap();
    assert_eq!(r.l2.unwrap().eviction.map(|e| e.line_address), Some(0));
    assert_eq!(h.released_owners(), 1);

    let freed = h.l3().peek(0).unwrap();
    assert!(freed.valid, "L3 keeps the line");
    assert_eq!(freed.owner, None);
    assert_eq!(h.l3().peek(stride).unwrap().owner, Some(0));

    // Core 1 fills the rest of the L3 set, then reclaims the freed way.
    let l3_stride = h.l3().geometry().set_stride();
    for k in 1..16 {
        let _ = h.access(k * l3_stride, 1).unwrap();
    }
    assert_eq!(h.l3().peek(0).unwrap().owner, None);

    let r = h.access(16 * l3_stride, 1).unwrap();
    let eviction = r.l3.unwrap().eviction.unwrap();
    assert_eq!(eviction.line_address, 0);
    assert_eq!(eviction.owner, None);
    assert!(!eviction.forced);
    assert!(!h.l3().contains(0));
    assert_eq!(h.l3().peek(16 * l3_stride).unwrap().owner, Some(1));
    assert_eq!(h.l3().alarm_counters().unwrap().lifetime_count(1), 0);
}

// ══════════════════════════════════════════════════════════
// 3. Inclusion
// ══════════════════════════════════════════════════════════

#[test]
fn attacker_forced_eviction_back_invalidates_l2() {
    init_tracing();
    let mut h = hierarchy(&config_with(tiny_l2(), tiny_l3(), 2));
    let stride = h.l3().geometry().set_stride();

    let _ = h.access(0, 0).unwrap();
    assert!(h.l2().contains(0));

    let r = h.access(stride, 1).unwrap();
    let eviction = r.l3.unwrap().eviction.unwrap();
    assert!(eviction.forced);
    assert_eq!(eviction.owner, Some(0));

    assert!(!h.l2().contains(0));
    assert!(!h.l3().contains(0));
    assert_eq!(h.back_invalidations(), 1);
    assert_eq!(h.l3().alarm_counters().unwrap().lifetime_count(1), 1);

    // The victim now misses all the way out and forces in turn.
    let back = h.access(0, 0).unwrap();
    assert_eq!(back.penalty, 100);
    assert_eq!(h.l3().alarm_counters().unwrap().lifetime_count(0), 1);
    assert_inclusive(&h);
}

#[test]
fn top_of_address_space_is_back_invalidated() {
    let mut h = hierarchy(&config_with(tiny_l2(), tiny_l3(), 2));
    let top = 0xFFFF_FFFF_FFFF_FFC0;
    let stride = h.l3().geometry().set_stride();

    let _ = h.access(top, 0).unwrap();
    assert!(h.l2().contains(top));

    let r = h.access(top - stride, 1).unwrap();
    assert_eq!(r.l3.unwrap().eviction.unwrap().line_address, top);
    assert!(!h.l2().contains(top));
    assert_eq!(h.back_invalidations(), 1);
    assert_inclusive(&h);
}

#[test]
fn victim_self_eviction_in_l3_back_invalidates_l2() {
    // L2 (2-way, 8 sets) can hold two lines of one L3 set (1-way).
    let mut h = hierarchy(&config_with(tiny_l2(), tiny_l3(), 2));
    let stride = h.l3().geometry().set_stride();
    let _ = h.access(0, 0).unwrap();
    let _ = h.access(stride, 0).unwrap();
    assert!(!h.l2().contains(0));
    assert!(h.l2().contains(stride));
    assert_inclusive(&h);
}

proptest! {
    /// Inclusion holds after any interleaving of victim and attacker accesses.
    #[test]
    fn inclusion_is_maintained(ops in prop::collection::vec((0u64..(64 * 1024), 0usize..5), 1..300)) {
        let mut h = hierarchy(&tiny_config());
        for (addr, core) in ops {
            let _ = h.access(addr, core).unwrap();
        }
        assert_inclusive(&h);
    }
}
