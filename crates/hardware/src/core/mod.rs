//! Cache model.
//!
//! 1. **Cache:** set-associative storage with LRU and SHARP replacement.
//! 2. **Hierarchy:** private L2 over shared L3 with inclusion.
//! 3. **Alarm:** windowed monitor of SHARP forced evictions.

/// Windowed alarm monitor.
pub mod alarm;
/// Set-associative cache, geometry and replacement policies.
pub mod cache;
/// L2/L3 hierarchy and inclusion protocol.
pub mod hierarchy;

pub use alarm::{AlarmEvent, AlarmMonitor};
pub use cache::{AccessResult, Cache, CacheGeometry, Eviction, Way};
pub use hierarchy::{CacheHierarchy, HierarchyAccess};
