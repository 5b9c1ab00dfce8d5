//! Side-channel attack model.
//!
//! Spies probe the shared cache from their own cores, building timing
//! histories that the reconstructor turns into a guess of the victim's
//! secret exponent.

/// Congruent address generation.
pub mod eviction_set;
/// History-to-key heuristics and scoring.
pub mod reconstruct;
/// Spy agent state machines.
pub mod spy;

pub use eviction_set::EvictionSet;
pub use reconstruct::{
    InvalidKeySymbol, KeyBit, KeyReconstructor, KeyScore, MergedKey, RecoveredKey,
    merge_partial_keys, parse_bits,
};
pub use spy::{SpyAgent, SpyHistory, SpyRole};
