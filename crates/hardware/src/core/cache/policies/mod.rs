//! Cache Replacement Policies.
//!
//! Implements the algorithms selecting victim ways in set-associative caches.
//!
//! # Policies
//!
//! - `Lru`: Least Recently Used (private L2).
//! - `Sharp`: ownership-partitioned eviction with alarm counters (shared L3).

/// Least Recently Used replacement policy.
pub mod lru;

/// SHARP partitioned replacement policy.
pub mod sharp;

use std::fmt;

pub use lru::LruPolicy;
pub use sharp::{AlarmCounters, SharpPolicy};

use super::Way;
use crate::common::addr::CoreId;

/// Victim chosen by a policy for an incoming line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VictimChoice {
    /// Way index within the set.
    pub way: usize,
    /// Whether the choice was a forced (alarm-raising) eviction.
    pub forced: bool,
}

/// Trait for cache replacement policies.
///
/// Timestamps are maintained by the cache itself; a policy only reads the
/// set's ways and picks where the incoming line goes.
pub trait ReplacementPolicy: Send + Sync + fmt::Debug {
    /// Selects the way that will receive a line requested by `core`.
    ///
    /// # Arguments
    ///
    /// * `ways` - The ways of the target set, in way order.
    /// * `core` - The requesting core.
    fn select_victim(&mut self, ways: &[Way], core: CoreId) -> VictimChoice;

    /// Whether installed lines record the requesting core as owner.
    fn tracks_ownership(&self) -> bool {
        false
    }

    /// Per-core forced-eviction counters, for policies that keep them.
    fn alarm_counters(&self) -> Option<&AlarmCounters> {
        None
    }

    /// Mutable access to the per-core forced-eviction counters.
    fn alarm_counters_mut(&mut self) -> Option<&mut AlarmCounters> {
        None
    }
}

/// Way indices of a set ordered from least to most recently used.
///
/// Ties keep way order, so untouched ways come out lowest index first.
pub fn lru_order(ways: &[Way]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..ways.len()).collect();
    order.sort_by_key(|&i| ways[i].lru);
    order
}
