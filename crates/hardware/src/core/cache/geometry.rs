//! Cache geometry and address decomposition.
//!
//! A line address is split into three fields whose masks partition the
//! address bits exactly once:
//!
//! ```text
//! | tag (remaining high bits) | set index (set_bits) | block offset (blk_bits) |
//! ```

use crate::common::error::ConfigError;
use crate::config::CacheConfig;

/// Immutable geometry derived from a [`CacheConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheGeometry {
    /// Number of sets (power of two).
    pub sets: usize,
    /// Ways per set.
    pub associativity: usize,
    /// Line size in bytes (power of two).
    pub line_size: u64,
    /// Width of the block offset field.
    pub blk_bits: u32,
    /// Width of the set index field.
    pub set_bits: u32,
    /// Mask selecting the block offset bits.
    pub block_offset_mask: u64,
    /// Mask selecting the set index bits (unshifted).
    pub set_mask: u64,
    /// Mask selecting the tag bits (unshifted).
    pub tag_mask: u64,
}

impl CacheGeometry {
    /// Derives and validates the geometry of one cache level.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a field is zero, the line size or the
    /// derived set count is not a power of two, or the capacity does not split
    /// evenly into `line_size * associativity` sets.
    pub fn new(level: &'static str, config: &CacheConfig) -> Result<Self, ConfigError> {
        for (field, value) in [
            ("size_kb", config.size_kb),
            ("line_size", config.line_size),
            ("miss_penalty", config.miss_penalty),
            ("associativity", config.associativity),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroField { level, field });
            }
        }
        if !config.line_size.is_power_of_two() {
            return Err(ConfigError::LineSizeNotPowerOfTwo {
                level,
                line_size: config.line_size,
            });
        }

        let indivisible = || ConfigError::IndivisibleGeometry {
            level,
            size_bytes: config.size_kb.saturating_mul(1024),
            line_size: config.line_size,
            associativity: config.associativity,
        };
        let size_bytes = config.size_kb.checked_mul(1024).ok_or_else(indivisible)?;
        let set_bytes = config
            .line_size
            .checked_mul(config.associativity)
            .ok_or_else(indivisible)?;
        if size_bytes % set_bytes != 0 {
            return Err(indivisible());
        }
        let sets = size_bytes / set_bytes;
        if !sets.is_power_of_two() {
            return Err(ConfigError::SetCountNotPowerOfTwo { level, sets });
        }

        let blk_bits = config.line_size.trailing_zeros();
        let set_bits = sets.trailing_zeros();
        let block_offset_mask = config.line_size - 1;
        let set_mask = (sets - 1) << blk_bits;
        Ok(Self {
            sets: sets as usize,
            associativity: config.associativity as usize,
            line_size: config.line_size,
            blk_bits,
            set_bits,
            block_offset_mask,
            set_mask,
            tag_mask: !(block_offset_mask | set_mask),
        })
    }

    /// Splits `addr` into `(tag, set_index, offset)`.
    #[inline]
    pub fn decompose(&self, addr: u64) -> (u64, usize, u64) {
        let offset = addr & self.block_offset_mask;
        let set = ((addr & self.set_mask) >> self.blk_bits) as usize;
        let tag = addr
            .checked_shr(self.blk_bits + self.set_bits)
            .unwrap_or(0);
        (tag, set, offset)
    }

    /// Reassembles the line-aligned address holding `tag` in `set`.
    #[inline]
    pub fn line_address(&self, tag: u64, set: usize) -> u64 {
        let high = tag.checked_shl(self.blk_bits + self.set_bits).unwrap_or(0);
        high | ((set as u64) << self.blk_bits)
    }

    /// Rounds `addr` down to its containing line.
    #[inline]
    pub fn line_align(&self, addr: u64) -> u64 {
        addr & !self.block_offset_mask
    }

    /// Distance in bytes between consecutive addresses mapping to the same set.
    pub fn set_stride(&self) -> u64 {
        (self.sets as u64) << self.blk_bits
    }

    /// Total capacity in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.set_stride() * self.associativity as u64
    }
}
