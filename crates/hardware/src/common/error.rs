//! Error definitions.
//!
//! This module defines the error types of the simulator. It provides:
//! 1. **Configuration Errors:** Ill-formed cache geometry or attack parameters, fatal at construction.
//! 2. **Simulation Errors:** Invariant violations and misuse of the event boundary at run time.
//!
//! Hits, misses, ownership transfer and forced evictions are ordinary control
//! flow and never surface as errors.

use thiserror::Error;

use super::addr::CoreId;

/// Errors raised while validating a [`Config`](crate::config::Config) or deriving cache geometry.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// A geometry field that must be positive was zero.
    #[error("{level}: `{field}` must be positive")]
    ZeroField {
        /// Cache level the field belongs to.
        level: &'static str,
        /// Name of the offending field.
        field: &'static str,
    },

    /// The line size is not a power of two, so the block offset mask would be malformed.
    #[error("{level}: line size {line_size} is not a power of two")]
    LineSizeNotPowerOfTwo {
        /// Cache level.
        level: &'static str,
        /// Configured line size in bytes.
        line_size: u64,
    },

    /// `size_kb * 1024` is not an exact multiple of `line_size * associativity`.
    #[error("{level}: {size_bytes} bytes is not divisible into {line_size}-byte lines x {associativity} ways")]
    IndivisibleGeometry {
        /// Cache level.
        level: &'static str,
        /// Total capacity in bytes.
        size_bytes: u64,
        /// Line size in bytes.
        line_size: u64,
        /// Number of ways per set.
        associativity: u64,
    },

    /// The derived set count is not a power of two, so the set index mask would be malformed.
    #[error("{level}: derived set count {sets} is not a power of two")]
    SetCountNotPowerOfTwo {
        /// Cache level.
        level: &'static str,
        /// Derived number of sets.
        sets: u64,
    },

    /// A probability parameter fell outside `[0, 1]`.
    #[error("activation probability {0} is outside [0, 1]")]
    InvalidProbability(f64),

    /// The configured core count cannot host the victim plus every attacking agent.
    #[error("{cores} core(s) configured but the attack needs {required}")]
    TooFewCores {
        /// Configured core count.
        cores: usize,
        /// Cores required by the attack mode.
        required: usize,
    },

    /// The multi-spy attack was configured without any spy.
    #[error("multi-spy attack requires at least one spy")]
    NoSpies,
}

/// Errors raised while the simulation is running.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SimError {
    /// A set index outside the cache's set range reached the arena.
    ///
    /// Signals a configuration or decomposition bug; indices are never clamped.
    #[error("set index {index} out of range for {sets} sets")]
    SetIndexOutOfRange {
        /// Offending index.
        index: usize,
        /// Number of sets in the cache.
        sets: usize,
    },

    /// An access named a core the hierarchy was not built for.
    #[error("core {core} is not modelled ({cores} cores configured)")]
    UnknownCore {
        /// Requesting core.
        core: CoreId,
        /// Configured core count.
        cores: usize,
    },

    /// An event arrived after `end_of_run`.
    #[error("event delivered after end of run")]
    RunEnded,

    /// Construction-time configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while reading a textual event trace.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The trace source could not be read.
    #[error("trace read failed: {0}")]
    Io(#[from] std::io::Error),

    /// A trace line could not be parsed.
    #[error("trace line {line}: {message}")]
    Parse {
        /// One-based line number.
        line: usize,
        /// Description of the problem.
        message: String,
    },
}
