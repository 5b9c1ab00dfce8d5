//! # Unit Components
//!
//! This module serves as the central hub for the component tests, mirroring
//! the crate layout: configuration, the cache model, the attack model, the
//! simulation driver and the end-of-run report.


/// Configuration defaults, JSON loading and validation.
pub mod config;



/// Unit tests for the end-of-run report.
pub mod stats;
