//! Simulation driver and event sources.
//!
//! The [`Simulator`] owns a run. Events come from a text trace
//! ([`trace`]) or from the synthetic victim ([`workload`]).

/// Simulation context and event boundary.
pub mod simulator;
/// Text trace parser.
pub mod trace;
/// Synthetic square-and-multiply victim.
pub mod workload;

pub use simulator::{Simulator, VictimEvent};
pub use workload::SquareMultiply;
