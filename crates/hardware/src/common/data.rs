//! Memory Access Types.
//!
//! Classifies the victim events delivered by the instrumentation boundary.
//! The kind does not change cache behaviour (every access is a load into the
//! hierarchy) but it is tracked for run statistics.

use std::fmt;

/// Type of memory access operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessType {
    /// Instruction fetch of a retired victim instruction.
    Fetch,

    /// Data read operand.
    Read,

    /// Data write operand.
    ///
    /// Writes allocate exactly like reads; no dirty state is modelled.
    Write,
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}
