//! Core identifiers.

/// Index of a simulated core.
///
/// Core 0 is the victim and the only core with a private L2.
pub type CoreId = usize;

/// The victim core.
pub const VICTIM_CORE: CoreId = 0;
