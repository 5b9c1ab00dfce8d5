//! Common utilities and types used throughout the simulator.
//!
//! 1. **Cores:** Core identifiers and the victim core.
//! 2. **Memory Access:** Classification of victim events (fetch/read/write).
//! 3. **Error Handling:** Configuration, simulation and trace error enums.

/// Core identifiers.
pub mod addr;

/// Memory access type definitions.
pub mod data;

/// Error types.
pub mod error;

pub use addr::{CoreId, VICTIM_CORE};
pub use data::AccessType;
pub use error::{ConfigError, SimError, TraceError};
