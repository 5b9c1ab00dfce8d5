//! Least Recently Used (LRU) Replacement Policy.
//!
//! Recency is tracked by the per-way timestamps the cache bumps to
//! `max(set) + 1` on every hit and install. The victim is the first invalid
//! way, otherwise the way with the smallest timestamp.
//!
//! # Performance
//!
//! - **Time Complexity:** `select_victim()`: O(W) where W is the associativity
//! - **Space Complexity:** O(1); state lives in the ways
//! - **Worst Case:** Cyclic scans over W + 1 aliasing lines miss on every access

use super::{ReplacementPolicy, VictimChoice};
use crate::common::addr::CoreId;
use crate::core::cache::Way;

/// LRU Policy.
#[derive(Clone, Copy, Debug, Default)]
pub struct LruPolicy;

impl LruPolicy {
    /// Creates a new LRU policy instance.
    pub const fn new() -> Self {
        Self
    }
}

impl ReplacementPolicy for LruPolicy {
    fn select_victim(&mut self, ways: &[Way], _core: CoreId) -> VictimChoice {
        let way = ways
            .iter()
            .position(|w| !w.valid)
            .or_else(|| {
                ways.iter()
                    .enumerate()
                    .min_by_key(|(_, w)| w.lru)
                    .map(|(i, _)| i)
            })
            .unwrap_or(0);
        VictimChoice { way, forced: false }
    }
}
