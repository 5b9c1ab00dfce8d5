//! SHARP cache hierarchy and side-channel attack simulator.
//!
//! This crate models a two-level cache under attack, with the following:
//! 1. **Core:** Set-associative caches (LRU, SHARP), the L2/L3 hierarchy and the alarm monitor.
//! 2. **Attack:** Eviction sets, spy agents and key reconstruction.
//! 3. **Simulation:** The simulator context, trace parsing and a synthetic victim.
//! 4. **Statistics:** End-of-run report.
//!
//! # Examples
//!
//! ```
//! use sharpsim_core::{Config, Simulator, SquareMultiply};
//!
//! let config = Config::default();
//! let victim = SquareMultiply::new(vec![true, false, true, true], &config.attack);
//! let report = Simulator::new(config).unwrap().run(victim.events()).unwrap();
//! assert_eq!(report.instructions as usize, victim.instruction_count());
//! ```

/// Spy agents, eviction sets and key reconstruction.
pub mod attack;
/// Common types (core identifiers, access kinds, errors).
pub mod common;
/// Simulator configuration (defaults, enums, hierarchical config structures).
pub mod config;
/// Caches, hierarchy and alarm monitor.
pub mod core;
/// Simulator context and event sources.
pub mod sim;
/// End-of-run statistics and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Top-level simulation context.
pub use crate::sim::Simulator;
/// Synthetic victim.
pub use crate::sim::SquareMultiply;
/// End-of-run statistics.
pub use crate::stats::RunReport;
