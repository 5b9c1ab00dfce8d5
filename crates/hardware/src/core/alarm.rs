//! Alarm monitor.
//!
//! Detection-side complement to SHARP. The monitor counts victim instructions and,
//! at the end of every window, flags each core whose forced-eviction counter
//! exceeds the threshold. Abnormally many forced evictions are the
//! statistical fingerprint of active probing. Counters are reset at every
//! window end, whether or not anything was flagged.

use tracing::warn;

use super::cache::policies::AlarmCounters;
use crate::common::addr::CoreId;
use crate::config::AlarmConfig;

/// A core flagged at the end of a window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlarmEvent {
    /// Offending core.
    pub core: CoreId,
    /// Forced evictions it caused during the window.
    pub count: u64,
    /// Zero-based index of the window.
    pub window: u64,
}

/// Periodic evaluator of the SHARP alarm counters.
#[derive(Clone, Debug)]
pub struct AlarmMonitor {
    cycle: u64,
    window: u64,
    threshold: u64,
    windows_completed: u64,
    warnings: Vec<u64>,
}

impl AlarmMonitor {
    /// Creates a monitor for `cores` cores.
    pub fn new(config: &AlarmConfig, cores: usize) -> Self {
        Self {
            cycle: 0,
            window: config.window.max(1),
            threshold: config.threshold,
            windows_completed: 0,
            warnings: vec![0; cores],
        }
    }

    /// Advances the clock by one victim instruction.
    ///
    /// When the window completes, returns one event per core above the
    /// threshold, resets every window counter and restarts the window.
    /// `counters` is `None` when the shared level does not run SHARP.
    pub fn tick(&mut self, counters: Option<&mut AlarmCounters>) -> Vec<AlarmEvent> {
        self.cycle += 1;
        if self.cycle < self.window {
            return Vec::new();
        }

        let window = self.windows_completed;
        let mut events = Vec::new();
        if let Some(counters) = counters {
            for (core, &count) in counters.window_counts().iter().enumerate() {
                if count > self.threshold {
                    warn!(
                        core,
                        count,
                        window,
                        threshold = self.threshold,
                        "alarm: core exceeded forced-eviction threshold"
                    );
                    events.push(AlarmEvent { core, count, window });
                }
            }
            counters.reset_window();
        }

        for event in &events {
            if event.core >= self.warnings.len() {
                self.warnings.resize(event.core + 1, 0);
            }
            self.warnings[event.core] += 1;
        }
        self.cycle = 0;
        self.windows_completed += 1;
        events
    }

    /// Instructions elapsed in the current window.
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Windows completed so far.
    pub const fn windows_completed(&self) -> u64 {
        self.windows_completed
    }

    /// Warnings raised per core over the run.
    pub fn warnings(&self) -> &[u64] {
        &self.warnings
    }
}
