//! Set-Associative Cache Simulator.
//!
//! This module implements a configurable set-associative cache. Ways live in
//! one flat arena indexed by `(set, way)`; every set access is bounds-checked
//! and an out-of-range set index is reported, never clamped. Recency is kept
//! as per-way timestamps: a hit or an install sets the way's timestamp to
//! `max(set) + 1`, so touched ways carry unique, strictly increasing stamps.
//!
//! Victim selection is delegated to a [`ReplacementPolicy`]: plain LRU for
//! the private level, SHARP for the shared level.

/// Geometry derivation and address decomposition.
pub mod geometry;

/// Cache replacement policy implementations (LRU, SHARP).
pub mod policies;

pub use self::geometry::CacheGeometry;

use self::policies::{AlarmCounters, LruPolicy, ReplacementPolicy, SharpPolicy};
use crate::common::addr::CoreId;
use crate::common::error::{ConfigError, SimError};
use crate::config::{CacheConfig, ReplacementPolicy as PolicyType};

/// Penalty charged by a hit.
pub const HIT_PENALTY: u64 = 1;

/// One line-sized slot of a set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Way {
    /// Whether the way holds a line.
    pub valid: bool,
    /// Tag of the resident line.
    pub tag: u64,
    /// Recency timestamp; larger is more recent.
    pub lru: u64,
    /// Core that installed the line (SHARP only); `None` when free.
    pub owner: Option<CoreId>,
}

/// A valid line displaced by an install.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Eviction {
    /// Line-aligned address of the displaced line.
    pub line_address: u64,
    /// Owner of the displaced line.
    pub owner: Option<CoreId>,
    /// Whether SHARP had to force the eviction.
    pub forced: bool,
}

/// Outcome of one cache access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessResult {
    /// Whether the line was absent.
    pub miss: bool,
    /// The valid line displaced by the install, if any.
    pub eviction: Option<Eviction>,
    /// `HIT_PENALTY` on hit, the configured miss penalty on miss.
    pub penalty: u64,
}

impl AccessResult {
    /// Whether a previously valid line was evicted.
    pub const fn evicted(&self) -> bool {
        self.eviction.is_some()
    }
}

/// Cache simulator implementing a set-associative cache with a pluggable policy.
#[derive(Debug)]
pub struct Cache {
    name: &'static str,
    geometry: CacheGeometry,
    miss_penalty: u64,
    ways: Vec<Way>,
    policy: Box<dyn ReplacementPolicy>,
    accesses: u64,
    misses: u64,
}

impl Cache {
    /// Creates a cache from its configuration.
    ///
    /// # Arguments
    ///
    /// * `name` - Level name used in errors and logs (e.g. `"L3"`).
    /// * `config` - Geometry, miss penalty and policy.
    /// * `cores` - Number of cores, sizing the SHARP alarm counters.
    /// * `seed` - Seed of the SHARP forced-eviction generator.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for ill-formed geometry.
    pub fn new(
        name: &'static str,
        config: &CacheConfig,
        cores: usize,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        let geometry = CacheGeometry::new(name, config)?;
        let policy: Box<dyn ReplacementPolicy> = match config.policy {
            PolicyType::Lru => Box::new(LruPolicy::new()),
            PolicyType::Sharp => Box::new(SharpPolicy::new(cores, seed)),
        };
        Ok(Self {
            name,
            geometry,
            miss_penalty: config.miss_penalty,
            ways: vec![Way::default(); geometry.sets * geometry.associativity],
            policy,
            accesses: 0,
            misses: 0,
        })
    }

    /// Level name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Derived geometry.
    pub const fn geometry(&self) -> &CacheGeometry {
        &self.geometry
    }

    /// Penalty charged on a miss.
    pub const fn miss_penalty(&self) -> u64 {
        self.miss_penalty
    }

    /// Total accesses served.
    pub const fn accesses(&self) -> u64 {
        self.accesses
    }

    /// Total misses.
    pub const fn misses(&self) -> u64 {
        self.misses
    }

    /// SHARP alarm counters, when this level runs SHARP.
    pub fn alarm_counters(&self) -> Option<&AlarmCounters> {
        self.policy.alarm_counters()
    }

    /// Mutable SHARP alarm counters, when this level runs SHARP.
    pub fn alarm_counters_mut(&mut self) -> Option<&mut AlarmCounters> {
        self.policy.alarm_counters_mut()
    }

    /// Splits `addr` into `(tag, set_index, offset)`.
    pub fn decompose(&self, addr: u64) -> (u64, usize, u64) {
        self.geometry.decompose(addr)
    }

    /// The ways of set `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::SetIndexOutOfRange`] when `index` is not a set of this cache.
    pub fn set(&self, index: usize) -> Result<&[Way], SimError> {
        let range = self.set_range(index)?;
        Ok(&self.ways[range])
    }

    fn set_mut(&mut self, index: usize) -> Result<&mut [Way], SimError> {
        let range = self.set_range(index)?;
        Ok(&mut self.ways[range])
    }

    fn set_range(&self, index: usize) -> Result<std::ops::Range<usize>, SimError> {
        if index >= self.geometry.sets {
            return Err(SimError::SetIndexOutOfRange {
                index,
                sets: self.geometry.sets,
            });
        }
        let base = index * self.geometry.associativity;
        Ok(base..base + self.geometry.associativity)
    }

    /// Looks `tag` up in set `set_index`.
    ///
    /// On a hit the way becomes most recently used and its index is returned.
    /// On a miss nothing changes; the caller applies the eviction policy.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::SetIndexOutOfRange`] for an index outside the cache.
    pub fn lookup(&mut self, set_index: usize, tag: u64) -> Result<Option<usize>, SimError> {
        let ways = self.set_mut(set_index)?;
        let Some(hit) = ways.iter().position(|w| w.valid && w.tag == tag) else {
            return Ok(None);
        };
        let stamp = next_stamp(ways);
        ways[hit].lru = stamp;
        Ok(Some(hit))
    }

    /// Accesses the line containing `addr` on behalf of `core`.
    ///
    /// Counts the access, looks the line up and, on a miss, installs it in
    /// the way chosen by the policy. The returned result reports any valid
    /// line the install displaced, which the hierarchy needs for its
    /// inclusion bookkeeping.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::SetIndexOutOfRange`] if decomposition produced an
    /// invalid set, which indicates a geometry bug.
    pub fn access(&mut self, addr: u64, core: CoreId) -> Result<AccessResult, SimError> {
        self.accesses += 1;
        let (tag, set_index, _) = self.geometry.decompose(addr);

        if self.lookup(set_index, tag)?.is_some() {
            return Ok(AccessResult {
                miss: false,
                eviction: None,
                penalty: HIT_PENALTY,
            });
        }

        self.misses += 1;
        let tracks_ownership = self.policy.tracks_ownership();
        let range = self.set_range(set_index)?;
        let choice = self.policy.select_victim(&self.ways[range.clone()], core);
        let ways = &mut self.ways[range];
        if choice.way >= ways.len() {
            return Err(SimError::SetIndexOutOfRange {
                index: set_index,
                sets: self.geometry.sets,
            });
        }

        let previous = ways[choice.way];
        let eviction = previous.valid.then(|| Eviction {
            line_address: self.geometry.line_address(previous.tag, set_index),
            owner: previous.owner,
            forced: choice.forced,
        });
        let stamp = next_stamp(ways);
        ways[choice.way] = Way {
            valid: true,
            tag,
            lru: stamp,
            owner: tracks_ownership.then_some(core),
        };

        Ok(AccessResult {
            miss: true,
            eviction,
            penalty: self.miss_penalty,
        })
    }

    /// Returns a copy of the valid way holding the line of `addr`, without touching recency.
    pub fn peek(&self, addr: u64) -> Option<Way> {
        let (tag, set_index, _) = self.geometry.decompose(addr);
        self.set(set_index)
            .ok()?
            .iter()
            .find(|w| w.valid && w.tag == tag)
            .copied()
    }

    /// Whether the line of `addr` is resident.
    pub fn contains(&self, addr: u64) -> bool {
        self.peek(addr).is_some()
    }

    /// Marks the line of `addr` not-valid and frees its owner.
    ///
    /// Returns whether the line was resident.
    pub fn invalidate(&mut self, addr: u64) -> bool {
        self.with_resident(addr, |way| {
            way.valid = false;
            way.owner = None;
        })
    }

    /// Clears the owner of the resident line of `addr`, leaving it valid.
    ///
    /// Returns whether the line was resident.
    pub fn release_owner(&mut self, addr: u64) -> bool {
        self.with_resident(addr, |way| way.owner = None)
    }

    fn with_resident(&mut self, addr: u64, f: impl FnOnce(&mut Way)) -> bool {
        let (tag, set_index, _) = self.geometry.decompose(addr);
        let Ok(ways) = self.set_mut(set_index) else {
            return false;
        };
        match ways.iter_mut().find(|w| w.valid && w.tag == tag) {
            Some(way) => {
                f(way);
                true
            }
            None => false,
        }
    }
}

/// Timestamp making a way the most recently used of `ways`.
fn next_stamp(ways: &[Way]) -> u64 {
    ways.iter().map(|w| w.lru).max().unwrap_or(0) + 1
}
