//! End-of-run statistics and reporting.
//!
//! This module summarises a finished run. It provides:
//! 1. **Summary:** Victim instruction and operand counts, attack mode.
//! 2. **Alarms:** Per-core forced evictions and warnings, completed windows.
//! 3. **Memory:** L2/L3 accesses, misses and inclusion traffic.
//! 4. **Attack:** Per-agent observations and the reconstructed key.

use std::io::{self, Write};

use crate::attack::reconstruct::RecoveredKey;
use crate::common::addr::CoreId;
use crate::config::{AttackMode, ReplacementPolicy};
use crate::core::alarm::AlarmEvent;
use crate::core::cache::Cache;
use crate::sim::simulator::Simulator;

/// Section names accepted by [`RunReport::print_sections`].
pub const SECTIONS: [&str; 4] = ["summary", "alarms", "memory", "attack"];

const BANNER: &str = "==========================================================";
const RULE: &str = "----------------------------------------------------------";

/// Access counters of one cache level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LevelStats {
    /// Accesses seen.
    pub accesses: u64,
    /// Misses among them.
    pub misses: u64,
    /// Replacement policy of the level.
    pub policy: ReplacementPolicy,
}

impl LevelStats {
    fn of(cache: &Cache, policy: ReplacementPolicy) -> Self {
        Self {
            accesses: cache.accesses(),
            misses: cache.misses(),
            policy,
        }
    }

    /// Accesses that hit.
    pub const fn hits(&self) -> u64 {
        self.accesses - self.misses
    }

    /// Miss rate in percent; zero for an untouched level.
    pub fn miss_rate(&self) -> f64 {
        if self.accesses == 0 {
            0.0
        } else {
            (self.misses as f64 / self.accesses as f64) * 100.0
        }
    }
}

/// Alarm totals for one core.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoreAlarms {
    /// The core.
    pub core: CoreId,
    /// Forced evictions it caused over the whole run.
    pub forced_evictions: u64,
    /// Windows in which it was flagged.
    pub warnings: u64,
}

/// What one spy agent observed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AgentSummary {
    /// Agent identifier.
    pub id: usize,
    /// Core it ran on.
    pub core: CoreId,
    /// Times it was scheduled.
    pub activations: i64,
    /// Recorded hit flags.
    pub observations: usize,
    /// Recorded flags that were misses.
    pub misses: usize,
}

/// Statistics of a finished run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    /// Attack variant.
    pub mode: AttackMode,
    /// Victim instructions retired.
    pub instructions: u64,
    /// Victim operand reads.
    pub operand_reads: u64,
    /// Victim operand writes.
    pub operand_writes: u64,
    /// Alarm windows completed.
    pub windows_completed: u64,
    /// Per-core alarm totals.
    pub cores: Vec<CoreAlarms>,
    /// Every alarm raised, in order.
    pub alarms: Vec<AlarmEvent>,
    /// Private L2 counters.
    pub l2: LevelStats,
    /// Shared L3 counters.
    pub l3: LevelStats,
    /// L2 lines invalidated to keep inclusion.
    pub back_invalidations: u64,
    /// L3 owner entries cleared after L2 evictions.
    pub released_owners: u64,
    /// Per-agent observations.
    pub agents: Vec<AgentSummary>,
    /// Reconstructed key.
    pub key: RecoveredKey,
    /// Shared-L2 prober round bits, empty in multi-spy mode.
    pub rounds: Vec<bool>,
}

impl RunReport {
    /// Snapshots a simulator at end of run.
    pub fn collect(sim: &Simulator, key: RecoveredKey) -> Self {
        let hierarchy = sim.hierarchy();
        let config = sim.config();
        let lifetime = hierarchy
            .l3()
            .alarm_counters()
            .map(|c| c.lifetime_counts().to_vec())
            .unwrap_or_default();
        let warnings = sim.alarm().warnings();

        let cores = (0..hierarchy.cores())
            .map(|core| CoreAlarms {
                core,
                forced_evictions: lifetime.get(core).copied().unwrap_or(0),
                warnings: warnings.get(core).copied().unwrap_or(0),
            })
            .collect();

        let agents = sim
            .agents()
            .iter()
            .map(|agent| {
                let hits = &agent.history().hits;
                AgentSummary {
                    id: agent.id(),
                    core: agent.core(),
                    activations: agent.activations(),
                    observations: hits.len(),
                    misses: hits.iter().filter(|&&h| !h).count(),
                }
            })
            .collect();

        let rounds = sim
            .agents()
            .iter()
            .flat_map(|agent| agent.history().rounds.iter().copied())
            .collect();

        Self {
            mode: config.attack.mode,
            instructions: sim.instructions(),
            operand_reads: sim.operand_reads(),
            operand_writes: sim.operand_writes(),
            windows_completed: sim.alarm().windows_completed(),
            cores,
            alarms: sim.alarms().to_vec(),
            l2: LevelStats::of(hierarchy.l2(), config.cache.l2.policy),
            l3: LevelStats::of(hierarchy.l3(), config.cache.l3.policy),
            back_invalidations: hierarchy.back_invalidations(),
            released_owners: hierarchy.released_owners(),
            agents,
            key,
            rounds,
        }
    }

    /// Total forced evictions across cores.
    pub fn forced_evictions(&self) -> u64 {
        self.cores.iter().map(|c| c.forced_evictions).sum()
    }

    /// Writes the selected sections to `out`.
    ///
    /// An empty `sections` slice selects all of [`SECTIONS`].
    ///
    /// # Errors
    ///
    /// Propagates write failures of `out`.
    pub fn write_sections<W: Write>(&self, out: &mut W, sections: &[String]) -> io::Result<()> {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);

        if want("summary") {
            writeln!(out, "\n{BANNER}")?;
            writeln!(out, "SHARP CACHE SIMULATION STATISTICS")?;
            writeln!(out, "{BANNER}")?;
            writeln!(out, "attack_mode              {:?}", self.mode)?;
            writeln!(out, "victim_insts             {}", self.instructions)?;
            writeln!(out, "victim_reads             {}", self.operand_reads)?;
            writeln!(out, "victim_writes            {}", self.operand_writes)?;
            writeln!(out, "{RULE}")?;
        }
        if want("alarms") {
            writeln!(out, "ALARM MONITOR")?;
            writeln!(out, "  windows                {}", self.windows_completed)?;
            writeln!(out, "  alarms                 {}", self.alarms.len())?;
            for core in &self.cores {
                writeln!(
                    out,
                    "  core{:<4} forced: {:<10} | warnings: {}",
                    core.core, core.forced_evictions, core.warnings
                )?;
            }
            writeln!(out, "{RULE}")?;
        }
        if want("memory") {
            writeln!(out, "MEMORY HIERARCHY")?;
            for (name, level) in [("L2", &self.l2), ("L3", &self.l3)] {
                writeln!(
                    out,
                    "  {:<6} accesses: {:<10} | hits: {:<10} | miss_rate: {:.2}% ({:?})",
                    name,
                    level.accesses,
                    level.hits(),
                    level.miss_rate(),
                    level.policy
                )?;
            }
            writeln!(out, "  inclusion.back_inval   {}", self.back_invalidations)?;
            writeln!(out, "  owner.released         {}", self.released_owners)?;
            writeln!(out, "{RULE}")?;
        }
        if want("attack") {
            writeln!(out, "SPY AGENTS")?;
            for agent in &self.agents {
                writeln!(
                    out,
                    "  spy{:<3} core {:<3} activations: {:<8} | observations: {:<8} | misses: {}",
                    agent.id, agent.core, agent.activations, agent.observations, agent.misses
                )?;
            }
            if self.mode == AttackMode::SharedL2 {
                let rounds: String = self.rounds.iter().map(|&b| if b { '1' } else { '0' }).collect();
                writeln!(out, "  rounds                 {rounds}")?;
            }
            writeln!(out, "  key.len                {}", self.key.len())?;
            writeln!(out, "  key.unknowns           {}", self.key.unknowns())?;
            writeln!(out, "Combined Key: {}", self.key)?;
        }
        writeln!(out, "{BANNER}")
    }

    /// Prints the selected sections to stdout.
    pub fn print_sections(&self, sections: &[String]) {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        if let Err(err) = self.write_sections(&mut out, sections) {
            tracing::error!(%err, "failed to write report");
        }
    }

    /// Prints all statistics sections to stdout.
    ///
    /// Equivalent to `print_sections(&[])`.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}
