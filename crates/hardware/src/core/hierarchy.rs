//! Two-level cache hierarchy.
//!
//! A private L2 belongs to core 0 (the victim) and a shared L3 serves every
//! core. The protocol between them:
//!
//! 1. **Victim path:** core 0 looks up L2 first. When an L2 miss displaces a
//!    line, that line's L3 owner entry is cleared. L3 stays the inclusive
//!    backing store, so only the bookkeeping changes. The L3 access follows.
//! 2. **Attacker path:** other cores have no private cache and go to L3 directly.
//! 3. **Inclusion:** whenever an L3 install displaces a line still valid in
//!    L2, the L2 copy is invalidated.
//!
//! The penalty returned is what a spy observes as timing: the L2 hit penalty
//! when L2 serves the access, otherwise the L3 penalty.

use tracing::{debug, trace};

use super::cache::{AccessResult, Cache, Eviction};
use crate::common::addr::{CoreId, VICTIM_CORE};
use crate::common::error::{ConfigError, SimError};
use crate::config::Config;

/// Outcome of one hierarchy access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HierarchyAccess {
    /// Penalty observed by the requesting core.
    pub penalty: u64,
    /// L2 result (victim core only).
    pub l2: Option<AccessResult>,
    /// L3 result, absent when L2 hit.
    pub l3: Option<AccessResult>,
}

impl HierarchyAccess {
    /// Whether the access missed in the outermost level it reached.
    pub fn missed(&self) -> bool {
        self.l3.is_some_and(|r| r.miss)
    }
}

/// Private L2 (core 0, LRU) over a shared L3 (SHARP).
#[derive(Debug)]
pub struct CacheHierarchy {
    l2: Cache,
    l3: Cache,
    cores: usize,
    back_invalidations: u64,
    released_owners: u64,
}

impl CacheHierarchy {
    /// Builds both levels from `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for ill-formed geometry at either level.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let cores = config.core_count();
        Ok(Self {
            l2: Cache::new("L2", &config.cache.l2, cores, config.seed)?,
            l3: Cache::new("L3", &config.cache.l3, cores, config.seed)?,
            cores,
            back_invalidations: 0,
            released_owners: 0,
        })
    }

    /// The private L2.
    pub const fn l2(&self) -> &Cache {
        &self.l2
    }

    /// The shared L3.
    pub const fn l3(&self) -> &Cache {
        &self.l3
    }

    /// Mutable shared L3, for alarm counter maintenance.
    pub fn l3_mut(&mut self) -> &mut Cache {
        &mut self.l3
    }

    /// Number of modelled cores.
    pub const fn cores(&self) -> usize {
        self.cores
    }

    /// L2 lines invalidated to preserve inclusion.
    pub const fn back_invalidations(&self) -> u64 {
        self.back_invalidations
    }

    /// L3 owner entries cleared after L2 evictions.
    pub const fn released_owners(&self) -> u64 {
        self.released_owners
    }

    /// Accesses `addr` on behalf of `core`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnknownCore`] for a core outside the configured
    /// range, or propagates a cache invariant violation.
    pub fn access(&mut self, addr: u64, core: CoreId) -> Result<HierarchyAccess, SimError> {
        if core >= self.cores {
            return Err(SimError::UnknownCore {
                core,
                cores: self.cores,
            });
        }

        if core != VICTIM_CORE {
            let l3 = self.access_l3(addr, core)?;
            return Ok(HierarchyAccess {
                penalty: l3.penalty,
                l2: None,
                l3: Some(l3),
            });
        }

        let line = self.l2.geometry().line_align(addr);
        let l2 = self.l2.access(line, core)?;
        if !l2.miss {
            return Ok(HierarchyAccess {
                penalty: l2.penalty,
                l2: Some(l2),
                l3: None,
            });
        }

        if let Some(victim) = l2.eviction {
            if self.l3.release_owner(victim.line_address) {
                self.released_owners += 1;
                trace!(line = victim.line_address, "L2 eviction released L3 ownership");
            }
        }

        let l3 = self.access_l3(addr, core)?;
        Ok(HierarchyAccess {
            penalty: l3.penalty,
            l2: Some(l2),
            l3: Some(l3),
        })
    }

    fn access_l3(&mut self, addr: u64, core: CoreId) -> Result<AccessResult, SimError> {
        let line = self.l3.geometry().line_align(addr);
        let result = self.l3.access(line, core)?;
        if let Some(eviction) = result.eviction {
            self.enforce_inclusion(eviction, core);
        }
        Ok(result)
    }

    fn enforce_inclusion(&mut self, eviction: Eviction, requester: CoreId) {
        let l3_line = self.l3.geometry().line_size;
        let l2_line = self.l2.geometry().line_size;
        // Counted, so the top line of the address space cannot overflow.
        for k in 0..(l3_line / l2_line).max(1) {
            let addr = eviction.line_address.wrapping_add(k * l2_line);
            if self.l2.invalidate(addr) {
                self.back_invalidations += 1;
                debug!(
                    line = addr,
                    requester,
                    former_owner = ?eviction.owner,
                    forced = eviction.forced,
                    "L3 eviction invalidated L2 copy"
                );
            }
        }
    }
}
