//! Simulator: the single context that owns every piece of run state.
//!
//! Events come in through a pull-based boundary. Per victim instruction:
//! 1. Spies scheduled for the previous instruction run (after its operands).
//! 2. The alarm clock ticks.
//! 3. The instruction fetch goes through the hierarchy on core 0.
//!
//! Operand accesses follow with [`Simulator::on_memory_access`].
//! [`Simulator::end_of_run`] flushes the last pending spy activation and
//! produces the [`RunReport`]; later events are rejected.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, trace};

use crate::attack::reconstruct::KeyReconstructor;
use crate::attack::spy::SpyAgent;
use crate::common::addr::{CoreId, VICTIM_CORE};
use crate::common::data::AccessType;
use crate::common::error::SimError;
use crate::config::Config;
use crate::core::alarm::{AlarmEvent, AlarmMonitor};
use crate::core::hierarchy::{CacheHierarchy, HierarchyAccess};
use crate::stats::RunReport;

/// One event at the instrumentation boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VictimEvent {
    /// A victim instruction retired at this address.
    Instruction(u64),
    /// A memory operand of the current instruction.
    Memory {
        /// Effective address.
        addr: u64,
        /// Read or write.
        kind: AccessType,
        /// Issuing core.
        core: CoreId,
    },
}

/// Top-level simulation context.
#[derive(Debug)]
pub struct Simulator {
    config: Config,
    hierarchy: CacheHierarchy,
    alarm: AlarmMonitor,
    agents: Vec<SpyAgent>,
    activation: StdRng,
    pending_activation: bool,
    instructions: u64,
    operand_reads: u64,
    operand_writes: u64,
    alarms: Vec<AlarmEvent>,
    ended: bool,
}

impl Simulator {
    /// Validates `config` and builds the hierarchy, monitor and agents.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] when validation fails.
    pub fn new(config: Config) -> Result<Self, SimError> {
        config.validate()?;
        let hierarchy = CacheHierarchy::new(&config)?;
        let alarm = AlarmMonitor::new(&config.alarm, hierarchy.cores());
        let agents = SpyAgent::for_attack(&config.attack, &hierarchy);
        let activation = StdRng::seed_from_u64(config.seed.wrapping_add(1));
        info!(
            cores = hierarchy.cores(),
            agents = agents.len(),
            mode = ?config.attack.mode,
            seed = config.seed,
            "simulator ready"
        );
        Ok(Self {
            config,
            hierarchy,
            alarm,
            agents,
            activation,
            pending_activation: false,
            instructions: 0,
            operand_reads: 0,
            operand_writes: 0,
            alarms: Vec::new(),
            ended: false,
        })
    }

    /// Runs `events` to completion and returns the report.
    ///
    /// # Errors
    ///
    /// Propagates the first failing event.
    pub fn run<I>(mut self, events: I) -> Result<RunReport, SimError>
    where
        I: IntoIterator<Item = VictimEvent>,
    {
        for event in events {
            self.feed(event)?;
        }
        self.end_of_run()
    }

    /// A victim instruction retired at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::RunEnded`] after [`Self::end_of_run`], or
    /// propagates a hierarchy error.
    pub fn on_instruction(&mut self, addr: u64) -> Result<HierarchyAccess, SimError> {
        self.ensure_running()?;
        self.activate_spies()?;

        let events = self
            .alarm
            .tick(self.hierarchy.l3_mut().alarm_counters_mut());
        self.alarms.extend(events);

        self.instructions += 1;
        let access = self.hierarchy.access(addr, VICTIM_CORE)?;
        trace!(addr, penalty = access.penalty, "victim fetch");
        self.pending_activation = true;
        Ok(access)
    }

    /// A memory operand of the current instruction.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::RunEnded`] after [`Self::end_of_run`],
    /// [`SimError::UnknownCore`] for an unmodelled core, or a cache invariant
    /// violation.
    pub fn on_memory_access(
        &mut self,
        addr: u64,
        kind: AccessType,
        core: CoreId,
    ) -> Result<HierarchyAccess, SimError> {
        self.ensure_running()?;
        let access = self.hierarchy.access(addr, core)?;
        match kind {
            AccessType::Write => self.operand_writes += 1,
            AccessType::Read | AccessType::Fetch => self.operand_reads += 1,
        }
        trace!(addr, %kind, core, penalty = access.penalty, "victim operand");
        Ok(access)
    }

    /// Dispatches one boundary event.
    ///
    /// # Errors
    ///
    /// See [`Self::on_instruction`] and [`Self::on_memory_access`].
    pub fn feed(&mut self, event: VictimEvent) -> Result<(), SimError> {
        match event {
            VictimEvent::Instruction(addr) => self.on_instruction(addr).map(|_| ()),
            VictimEvent::Memory { addr, kind, core } => {
                self.on_memory_access(addr, kind, core).map(|_| ())
            }
        }
    }

    /// Ends the run: flushes pending spy activations and builds the report.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::RunEnded`] when called twice.
    pub fn end_of_run(&mut self) -> Result<RunReport, SimError> {
        self.ensure_running()?;
        self.activate_spies()?;
        self.ended = true;

        let key = KeyReconstructor::new(&self.config.attack).reconstruct(&self.agents);
        let report = RunReport::collect(self, key);
        info!(
            instructions = self.instructions,
            windows = self.alarm.windows_completed(),
            alarms = self.alarms.len(),
            key_len = report.key.len(),
            "run ended"
        );
        Ok(report)
    }

    /// The configuration of the run.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The cache hierarchy.
    pub const fn hierarchy(&self) -> &CacheHierarchy {
        &self.hierarchy
    }

    /// The alarm monitor.
    pub const fn alarm(&self) -> &AlarmMonitor {
        &self.alarm
    }

    /// The spy agents, in activation order.
    pub fn agents(&self) -> &[SpyAgent] {
        &self.agents
    }

    /// Alarm events raised so far.
    pub fn alarms(&self) -> &[AlarmEvent] {
        &self.alarms
    }

    /// Victim instructions delivered.
    pub const fn instructions(&self) -> u64 {
        self.instructions
    }

    /// Operand reads delivered.
    pub const fn operand_reads(&self) -> u64 {
        self.operand_reads
    }

    /// Operand writes delivered.
    pub const fn operand_writes(&self) -> u64 {
        self.operand_writes
    }

    /// Whether [`Self::end_of_run`] has been called.
    pub const fn has_ended(&self) -> bool {
        self.ended
    }

    const fn ensure_running(&self) -> Result<(), SimError> {
        if self.ended {
            Err(SimError::RunEnded)
        } else {
            Ok(())
        }
    }

    fn activate_spies(&mut self) -> Result<(), SimError> {
        if !self.pending_activation {
            return Ok(());
        }
        self.pending_activation = false;

        let p = self.config.attack.activation_probability;
        for agent in &mut self.agents {
            if self.activation.random_bool(p) {
                agent.activate(&mut self.hierarchy)?;
            }
        }
        Ok(())
    }
}
