//! SHARP Partitioned Replacement Policy.
//!
//! Ownership-aware eviction for the shared cache level. Each way remembers the
//! core that installed it; a miss from core `c` resolves, in order:
//!
//! 1. **Free way:** the least recently used way with no owner.
//! 2. **Self-owned way:** the least recently used way already owned by `c`.
//! 3. **Forced eviction:** a uniformly random way, regardless of recency, and
//!    `c`'s alarm counter is incremented.
//!
//! Steps 1 and 2 never touch another core's line. Step 3 is the only path
//! that can, and it is the signal the alarm monitor watches. The random pick
//! keeps the evicted core from predicting which of its lines goes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use super::{ReplacementPolicy, VictimChoice, lru_order};
use crate::common::addr::CoreId;
use crate::core::cache::Way;

/// Per-core forced-eviction counters.
///
/// Window counters are reset by the alarm monitor; lifetime counters are not.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlarmCounters {
    window: Vec<u64>,
    lifetime: Vec<u64>,
}

impl AlarmCounters {
    /// Creates zeroed counters for `cores` cores.
    pub fn new(cores: usize) -> Self {
        Self {
            window: vec![0; cores],
            lifetime: vec![0; cores],
        }
    }

    /// Records one forced eviction by `core`.
    pub fn increment(&mut self, core: CoreId) {
        if core >= self.window.len() {
            self.window.resize(core + 1, 0);
            self.lifetime.resize(core + 1, 0);
        }
        self.window[core] += 1;
        self.lifetime[core] += 1;
    }

    /// Forced evictions by `core` in the current window.
    pub fn window_count(&self, core: CoreId) -> u64 {
        self.window.get(core).copied().unwrap_or(0)
    }

    /// Forced evictions by `core` over the whole run.
    pub fn lifetime_count(&self, core: CoreId) -> u64 {
        self.lifetime.get(core).copied().unwrap_or(0)
    }

    /// Current window counters, indexed by core.
    pub fn window_counts(&self) -> &[u64] {
        &self.window
    }

    /// Lifetime counters, indexed by core.
    pub fn lifetime_counts(&self) -> &[u64] {
        &self.lifetime
    }

    /// Zeroes every window counter.
    pub fn reset_window(&mut self) {
        self.window.iter_mut().for_each(|c| *c = 0);
    }
}

/// SHARP Policy state.
#[derive(Debug)]
pub struct SharpPolicy {
    counters: AlarmCounters,
    rng: StdRng,
}

impl SharpPolicy {
    /// Creates a SHARP policy for `cores` cores with a seeded generator.
    pub fn new(cores: usize, seed: u64) -> Self {
        Self {
            counters: AlarmCounters::new(cores),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ReplacementPolicy for SharpPolicy {
    fn select_victim(&mut self, ways: &[Way], core: CoreId) -> VictimChoice {
        let order = lru_order(ways);

        if let Some(&way) = order.iter().find(|&&i| ways[i].owner.is_none()) {
            return VictimChoice { way, forced: false };
        }

        if let Some(&way) = order.iter().find(|&&i| ways[i].owner == Some(core)) {
            return VictimChoice { way, forced: false };
        }

        let way = self.rng.random_range(0..ways.len());
        self.counters.increment(core);
        trace!(core, way, victim_owner = ?ways[way].owner, "SHARP forced eviction");
        VictimChoice { way, forced: true }
    }

    fn tracks_ownership(&self) -> bool {
        true
    }

    fn alarm_counters(&self) -> Option<&AlarmCounters> {
        Some(&self.counters)
    }

    fn alarm_counters_mut(&mut self) -> Option<&mut AlarmCounters> {
        Some(&mut self.counters)
    }
}
