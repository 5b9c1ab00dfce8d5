//! Spy agents.
//!
//! Each agent is a small finite-state machine activated at most once per
//! victim instruction. Every activation advances its counter `cnt`; an agent
//! acts only once `cnt` reaches its `ready` time, then re-arms.
//!
//! # Roles
//!
//! - **Private probe** (multi-spy attack): one per attacker core. Together
//!   the probes own every L3 way of the victim's multiply set, so a multiply
//!   fetch from the victim has to force one of their lines out. Each probe
//!   walks its own lines one access per activation and records whether it
//!   hit. Agents stagger their ready times so co-resident spies take turns.
//! - **Primer** (shared-L2 attack, agent 0): runs on the victim core and
//!   keeps flushing the victim's square and multiply lines out of L2.
//! - **Prober** (shared-L2 attack, agent 1): owns every L3 way of the square
//!   and multiply sets, waits for the square set to be disturbed, then checks
//!   the multiply set to decide the round's bit.

use tracing::{debug, trace};

use super::eviction_set::EvictionSet;
use crate::common::addr::{CoreId, VICTIM_CORE};
use crate::common::error::SimError;
use crate::config::{AttackConfig, AttackMode};
use crate::core::hierarchy::CacheHierarchy;

/// What an agent has observed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpyHistory {
    /// Recorded boolean observations, consumed by the key reconstructor.
    ///
    /// Private probes push one hit flag per probe. The prober pushes `true`
    /// when it detects a square step, then the multiply set's hit flag for
    /// that round.
    pub hits: Vec<bool>,
    /// Raw probe penalties, in probe order.
    pub timings: Vec<u64>,
    /// Prober only: one entry per round, `true` when a multiply was seen.
    pub rounds: Vec<bool>,
}

/// Role-specific state of an agent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpyRole {
    /// Multi-spy private probe.
    PrivateProbe {
        /// This spy's share of the L3 lines congruent with the multiply target.
        lines: EvictionSet,
        /// Position in `lines` of the next probe.
        next: usize,
    },
    /// Shared-L2 agent 0: L2 prime lines for both targets.
    Primer {
        /// Lines filling the L2 sets of both targets.
        lines: EvictionSet,
    },
    /// Shared-L2 agent 1: L3 probe sets and round state.
    Prober {
        /// L3 eviction set of the square target.
        square: EvictionSet,
        /// L3 eviction set of the multiply target.
        multiply: EvictionSet,
        /// Set once a square step has been detected in the current round.
        iteration_started: bool,
    },
}

/// Scheduling parameters copied from the attack configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Schedule {
    wait_time: i64,
    agents: i64,
    warmup_delay: i64,
    round_delay: i64,
    miss_threshold: u64,
}

/// A timing probe bound to one core.
#[derive(Clone, Debug)]
pub struct SpyAgent {
    id: usize,
    core: CoreId,
    role: SpyRole,
    schedule: Schedule,
    cnt: i64,
    ready: i64,
    history: SpyHistory,
}

impl SpyAgent {
    /// Builds every agent the configured attack needs, in activation order.
    ///
    /// Multi-spy: spies `1..=spy_count` on cores `1..=spy_count`.
    /// Shared-L2: agent 0 on the victim core, agent 1 on core 1.
    pub fn for_attack(attack: &AttackConfig, hierarchy: &CacheHierarchy) -> Vec<Self> {
        let l2 = hierarchy.l2().geometry();
        let l3 = hierarchy.l3().geometry();
        let schedule = Schedule {
            wait_time: attack.wait_time,
            agents: attack.agent_count() as i64,
            warmup_delay: attack.warmup_delay,
            round_delay: attack.round_delay,
            miss_threshold: attack
                .miss_threshold
                .unwrap_or_else(|| hierarchy.l3().miss_penalty()),
        };

        match attack.mode {
            AttackMode::MultiSpy => {
                let spies = attack.spy_count;
                let set = EvictionSet::congruent(
                    l3,
                    attack.multiply_target,
                    l3.associativity.max(spies),
                    0,
                );
                (1..=spies)
                    .map(|id| {
                        let role = SpyRole::PrivateProbe {
                            lines: set.stripe(id - 1, spies),
                            next: 0,
                        };
                        Self::new(id, id, role, schedule)
                    })
                    .collect()
            }
            AttackMode::SharedL2 => {
                let ways = l2.associativity;
                let primer = EvictionSet::congruent_avoiding(l2, l3, attack.square_target, ways)
                    .chain(&EvictionSet::congruent_avoiding(
                        l2,
                        l3,
                        attack.multiply_target,
                        ways,
                    ));

                let square = EvictionSet::congruent(l3, attack.square_target, l3.associativity, 0);
                let same_set =
                    l3.decompose(attack.square_target).1 == l3.decompose(attack.multiply_target).1;
                let skip = if same_set { l3.associativity } else { 0 };
                let multiply =
                    EvictionSet::congruent(l3, attack.multiply_target, l3.associativity, skip);

                vec![
                    Self::new(0, VICTIM_CORE, SpyRole::Primer { lines: primer }, schedule),
                    Self::new(
                        1,
                        1,
                        SpyRole::Prober {
                            square,
                            multiply,
                            iteration_started: false,
                        },
                        schedule,
                    ),
                ]
            }
        }
    }

    fn new(id: usize, core: CoreId, role: SpyRole, schedule: Schedule) -> Self {
        Self {
            id,
            core,
            role,
            schedule,
            cnt: 0,
            ready: 0,
            history: SpyHistory::default(),
        }
    }

    /// Agent identifier.
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Core the agent runs on.
    pub const fn core(&self) -> CoreId {
        self.core
    }

    /// Role and role-specific state.
    pub const fn role(&self) -> &SpyRole {
        &self.role
    }

    /// Activations so far.
    pub const fn activations(&self) -> i64 {
        self.cnt
    }

    /// Activation count at which the agent next acts.
    pub const fn ready(&self) -> i64 {
        self.ready
    }

    /// Recorded observations.
    pub const fn history(&self) -> &SpyHistory {
        &self.history
    }

    /// Whether the prober is between a square detection and its multiply check.
    pub const fn iteration_started(&self) -> bool {
        matches!(
            self.role,
            SpyRole::Prober {
                iteration_started: true,
                ..
            }
        )
    }

    /// Runs one activation against the hierarchy.
    ///
    /// # Errors
    ///
    /// Propagates hierarchy errors (unknown core, cache invariant violation).
    pub fn activate(&mut self, hierarchy: &mut CacheHierarchy) -> Result<(), SimError> {
        self.cnt += 1;
        match self.role {
            SpyRole::PrivateProbe { .. } => self.private_probe(hierarchy),
            SpyRole::Primer { .. } => self.prime(hierarchy),
            SpyRole::Prober { .. } => self.shared_probe(hierarchy),
        }
    }

    fn private_probe(&mut self, hierarchy: &mut CacheHierarchy) -> Result<(), SimError> {
        let Schedule {
            wait_time, agents, ..
        } = self.schedule;
        let id = self.id as i64;
        let core = self.core;
        let SpyRole::PrivateProbe { lines, next } = &mut self.role else {
            return Ok(());
        };

        if self.cnt == 1 {
            for &line in lines.lines() {
                let _ = hierarchy.access(line, core)?;
            }
            self.ready = wait_time.saturating_sub(id);
            debug!(spy = self.id, lines = lines.len(), "spy filled its share of the L3 set");
            return Ok(());
        }
        if self.cnt < self.ready {
            return Ok(());
        }
        let Some(&line) = lines.lines().get(*next) else {
            return Ok(());
        };
        *next = (*next + 1) % lines.len();

        let access = hierarchy.access(line, core)?;
        let hit = access.penalty < self.schedule.miss_threshold;
        self.history.timings.push(access.penalty);
        self.history.hits.push(hit);
        trace!(spy = self.id, cnt = self.cnt, penalty = access.penalty, hit, "spy probe");

        let offset = if self.cnt % 2 == 1 {
            wait_time.saturating_add(agents - id - 1).saturating_sub(id)
        } else {
            wait_time.saturating_add(id).saturating_sub(agents - id - 1)
        };
        self.ready = self.ready.saturating_add(offset.max(1));
        Ok(())
    }

    fn prime(&mut self, hierarchy: &mut CacheHierarchy) -> Result<(), SimError> {
        if self.cnt < self.ready {
            return Ok(());
        }
        if let SpyRole::Primer { lines } = &self.role {
            for &line in lines.lines() {
                let _ = hierarchy.access(line, self.core)?;
            }
        }
        self.ready = self.cnt + 1;
        Ok(())
    }

    fn shared_probe(&mut self, hierarchy: &mut CacheHierarchy) -> Result<(), SimError> {
        let core = self.core;
        let Schedule {
            wait_time,
            warmup_delay,
            round_delay,
            miss_threshold,
            ..
        } = self.schedule;
        let SpyRole::Prober {
            square,
            multiply,
            iteration_started,
        } = &mut self.role
        else {
            return Ok(());
        };

        if self.cnt == 1 {
            for &line in square.lines().iter().chain(multiply.lines()) {
                let _ = hierarchy.access(line, core)?;
            }
            self.ready = self.cnt.saturating_add(warmup_delay.max(1));
            debug!(spy = self.id, lines = square.len() + multiply.len(), "prober filled L3 eviction sets");
            return Ok(());
        }
        if self.cnt < self.ready {
            return Ok(());
        }

        if *iteration_started {
            let slow = probe(hierarchy, multiply, core, miss_threshold, &mut self.history.timings)?;
            self.history.hits.push(!slow);
            self.history.rounds.push(slow);
            *iteration_started = false;
            self.ready = self.cnt.saturating_add(round_delay.max(1));
            debug!(spy = self.id, round = self.history.rounds.len(), multiply = slow, "round decided");
        } else if probe(hierarchy, square, core, miss_threshold, &mut self.history.timings)? {
            self.history.hits.push(true);
            *iteration_started = true;
            self.ready = self.cnt.saturating_add(wait_time.max(1));
            trace!(spy = self.id, cnt = self.cnt, "square step detected");
        } else {
            self.ready = self.cnt + 1;
        }
        Ok(())
    }
}

/// Accesses every line of `set`; returns whether any access was slow.
fn probe(
    hierarchy: &mut CacheHierarchy,
    set: &EvictionSet,
    core: CoreId,
    miss_threshold: u64,
    timings: &mut Vec<u64>,
) -> Result<bool, SimError> {
    let mut slow = false;
    for &line in set.lines() {
        let penalty = hierarchy.access(line, core)?.penalty;
        timings.push(penalty);
        slow |= penalty >= miss_threshold;
    }
    Ok(slow)
}
