//! Configuration system for the SHARP simulator.
//!
//! This module defines all configuration structures and enums used to parameterize
//! a run. It provides:
//! 1. **Defaults:** Baseline cache geometry (taken from a real i7), attack and alarm constants.
//! 2. **Structures:** Hierarchical config for the cache levels, the attack and the alarm monitor.
//! 3. **Enums:** Replacement policy and attack mode selectors.
//!
//! Configuration is supplied once at start of run as JSON, or built from `Config::default()`.

use serde::Deserialize;

use crate::common::error::ConfigError;

/// Default configuration constants for the simulator.
mod defaults {
    /// Private L2 capacity in KB.
    pub const L2_SIZE_KB: u64 = 256;

    /// Private L2 associativity.
    pub const L2_WAYS: u64 = 4;

    /// Shared L3 capacity in KB (16 MB; the i7's 12 MB yields a non power-of-two set count).
    pub const L3_SIZE_KB: u64 = 16384;

    /// Shared L3 associativity.
    pub const L3_WAYS: u64 = 16;

    /// Line size in bytes for both levels.
    pub const LINE_SIZE: u64 = 64;

    /// Penalty charged on a miss, in instruction-count units.
    pub const MISS_PENALTY: u64 = 100;

    /// Alarm window length in victim instructions.
    pub const ALARM_WINDOW: u64 = 10_000;

    /// Forced evictions per window tolerated before a core is flagged.
    pub const ALARM_THRESHOLD: u64 = 100;

    /// Number of spies in the multi-spy attack.
    pub const SPY_COUNT: usize = 4;

    /// Per-instruction probability that a spy gets scheduled.
    pub const ACTIVATION_PROBABILITY: f64 = 0.9;

    /// Entry of the victim's square routine.
    pub const SQUARE_TARGET: u64 = 0x4014e3;

    /// Entry of the victim's multiply routine.
    pub const MULTIPLY_TARGET: u64 = 0x4016dc;

    /// Base spy wait time, in activations.
    pub const WAIT_TIME: i64 = 30;

    /// Delay armed after the shared-L2 spy fills its eviction sets.
    pub const WARMUP_DELAY: i64 = 200;

    /// Delay armed after a shared-L2 round decision.
    pub const ROUND_DELAY: i64 = 60;
}

/// Cache replacement policy algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReplacementPolicy {
    /// Least Recently Used; used by the private L2.
    #[default]
    #[serde(alias = "Lru", alias = "lru")]
    Lru,
    /// Ownership-partitioned SHARP policy; used by the shared L3.
    #[serde(alias = "Sharp", alias = "sharp")]
    Sharp,
}

/// Attack variant driven by the spy agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum AttackMode {
    /// One private-probe spy per attacker core; hit patterns are combined across spies.
    #[default]
    #[serde(alias = "multi_spy")]
    MultiSpy,
    /// Two agents: one sharing the victim's L2 (prime), one remote (probe).
    #[serde(alias = "shared_l2")]
    SharedL2,
}

/// Root configuration structure containing all simulator settings.
///
/// # Examples
///
/// ```
/// use sharpsim_core::config::{AttackMode, Config, ReplacementPolicy};
///
/// let json = r#"{
///     "cache": {
///         "l2": { "size_kb": 256, "associativity": 4 },
///         "l3": { "size_kb": 16384, "associativity": 16, "policy": "SHARP" }
///     },
///     "attack": { "mode": "SharedL2", "activation_probability": 0.5 },
///     "seed": 7
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.cache.l3.policy, ReplacementPolicy::Sharp);
/// assert_eq!(config.attack.mode, AttackMode::SharedL2);
/// assert_eq!(config.core_count(), 2);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Cache hierarchy geometry.
    #[serde(default)]
    pub cache: CacheHierarchyConfig,
    /// Spy agent configuration.
    #[serde(default)]
    pub attack: AttackConfig,
    /// Alarm monitor configuration.
    #[serde(default)]
    pub alarm: AlarmConfig,
    /// Number of modelled cores; derived from the attack when absent.
    #[serde(default)]
    pub cores: Option<usize>,
    /// Seed shared by every pseudorandom source of the run.
    #[serde(default)]
    pub seed: u64,
}

impl Config {
    /// Parses a configuration from JSON, filling absent fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Number of cores the hierarchy is built for.
    pub fn core_count(&self) -> usize {
        self.cores.unwrap_or_else(|| self.attack.required_cores())
    }

    /// Checks every parameter that would otherwise corrupt the simulation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let _ = crate::core::cache::CacheGeometry::new("L2", &self.cache.l2)?;
        let _ = crate::core::cache::CacheGeometry::new("L3", &self.cache.l3)?;
        self.attack.validate()?;
        if self.alarm.window == 0 {
            return Err(ConfigError::ZeroField {
                level: "alarm",
                field: "window",
            });
        }
        let required = self.attack.required_cores();
        if self.core_count() < required {
            return Err(ConfigError::TooFewCores {
                cores: self.core_count(),
                required,
            });
        }
        Ok(())
    }
}

/// Private and shared cache level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheHierarchyConfig {
    /// Private L2 of core 0.
    #[serde(default = "CacheConfig::l2_default")]
    pub l2: CacheConfig,
    /// Shared L3.
    #[serde(default = "CacheConfig::l3_default")]
    pub l3: CacheConfig,
}

impl Default for CacheHierarchyConfig {
    fn default() -> Self {
        Self {
            l2: CacheConfig::l2_default(),
            l3: CacheConfig::l3_default(),
        }
    }
}

/// Geometry and timing of one cache level.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    /// Capacity in KB.
    pub size_kb: u64,
    /// Line size in bytes (power of two).
    #[serde(default = "CacheConfig::default_line_size")]
    pub line_size: u64,
    /// Penalty charged on a miss; a hit costs 1.
    #[serde(default = "CacheConfig::default_miss_penalty")]
    pub miss_penalty: u64,
    /// Ways per set.
    pub associativity: u64,
    /// Replacement policy of this level.
    #[serde(default)]
    pub policy: ReplacementPolicy,
}

impl CacheConfig {
    /// Default private L2: 256 KB, 64 B lines, 4-way, LRU.
    pub fn l2_default() -> Self {
        Self {
            size_kb: defaults::L2_SIZE_KB,
            line_size: defaults::LINE_SIZE,
            miss_penalty: defaults::MISS_PENALTY,
            associativity: defaults::L2_WAYS,
            policy: ReplacementPolicy::Lru,
        }
    }

    /// Default shared L3: 16 MB, 64 B lines, 16-way, SHARP.
    pub fn l3_default() -> Self {
        Self {
            size_kb: defaults::L3_SIZE_KB,
            line_size: defaults::LINE_SIZE,
            miss_penalty: defaults::MISS_PENALTY,
            associativity: defaults::L3_WAYS,
            policy: ReplacementPolicy::Sharp,
        }
    }

    fn default_line_size() -> u64 {
        defaults::LINE_SIZE
    }

    fn default_miss_penalty() -> u64 {
        defaults::MISS_PENALTY
    }
}

/// Spy agent parameters, built once and shared by every agent and the reconstructor.
#[derive(Debug, Clone, Deserialize)]
pub struct AttackConfig {
    /// Attack variant.
    #[serde(default)]
    pub mode: AttackMode,

    /// Spies in the multi-spy attack (the shared-L2 attack always uses two agents).
    #[serde(default = "AttackConfig::default_spy_count")]
    pub spy_count: usize,

    /// Probability that a given spy is activated on a victim instruction.
    #[serde(default = "AttackConfig::default_activation_probability")]
    pub activation_probability: f64,

    /// Address inside the victim's square routine.
    #[serde(default = "AttackConfig::default_square_target")]
    pub square_target: u64,

    /// Address inside the victim's multiply routine.
    #[serde(default = "AttackConfig::default_multiply_target")]
    pub multiply_target: u64,

    /// Base wait time between probes, in activations.
    #[serde(default = "AttackConfig::default_wait_time")]
    pub wait_time: i64,

    /// Delay after the shared-L2 spy's initial fill.
    #[serde(default = "AttackConfig::default_warmup_delay")]
    pub warmup_delay: i64,

    /// Delay after a shared-L2 round decision.
    #[serde(default = "AttackConfig::default_round_delay")]
    pub round_delay: i64,

    /// Probe penalty at or above which an access counts as a miss.
    /// Defaults to the L3 miss penalty.
    #[serde(default)]
    pub miss_threshold: Option<u64>,
}

impl AttackConfig {
    /// Number of spy agents the mode instantiates.
    pub fn agent_count(&self) -> usize {
        match self.mode {
            AttackMode::MultiSpy => self.spy_count,
            AttackMode::SharedL2 => 2,
        }
    }

    /// Cores needed for the victim plus all remote agents.
    pub fn required_cores(&self) -> usize {
        match self.mode {
            AttackMode::MultiSpy => self.spy_count + 1,
            // Agent 0 runs on the victim core.
            AttackMode::SharedL2 => 2,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.activation_probability) {
            return Err(ConfigError::InvalidProbability(self.activation_probability));
        }
        if self.mode == AttackMode::MultiSpy && self.spy_count == 0 {
            return Err(ConfigError::NoSpies);
        }
        Ok(())
    }

    fn default_spy_count() -> usize {
        defaults::SPY_COUNT
    }

    fn default_activation_probability() -> f64 {
        defaults::ACTIVATION_PROBABILITY
    }

    fn default_square_target() -> u64 {
        defaults::SQUARE_TARGET
    }

    fn default_multiply_target() -> u64 {
        defaults::MULTIPLY_TARGET
    }

    fn default_wait_time() -> i64 {
        defaults::WAIT_TIME
    }

    fn default_warmup_delay() -> i64 {
        defaults::WARMUP_DELAY
    }

    fn default_round_delay() -> i64 {
        defaults::ROUND_DELAY
    }
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            mode: AttackMode::default(),
            spy_count: defaults::SPY_COUNT,
            activation_probability: defaults::ACTIVATION_PROBABILITY,
            square_target: defaults::SQUARE_TARGET,
            multiply_target: defaults::MULTIPLY_TARGET,
            wait_time: defaults::WAIT_TIME,
            warmup_delay: defaults::WARMUP_DELAY,
            round_delay: defaults::ROUND_DELAY,
            miss_threshold: None,
        }
    }
}

/// Alarm monitor window parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AlarmConfig {
    /// Window length in victim instructions.
    #[serde(default = "AlarmConfig::default_window")]
    pub window: u64,
    /// A core is flagged when its window counter exceeds this value.
    #[serde(default = "AlarmConfig::default_threshold")]
    pub threshold: u64,
}

impl AlarmConfig {
    fn default_window() -> u64 {
        defaults::ALARM_WINDOW
    }

    fn default_threshold() -> u64 {
        defaults::ALARM_THRESHOLD
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            window: defaults::ALARM_WINDOW,
            threshold: defaults::ALARM_THRESHOLD,
        }
    }
}
