//! Eviction set construction.
//!
//! An eviction set for a target is a list of line addresses congruent with
//! the target (same set index, different tags) in a given cache geometry.

use crate::core::cache::CacheGeometry;

/// Upper bound on candidates examined per requested line when filtering.
const SEARCH_FACTOR: usize = 1024;

/// Line addresses aliasing into one cache set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvictionSet {
    lines: Vec<u64>,
}

impl EvictionSet {
    /// `count` lines congruent with `target` in `geometry`.
    ///
    /// Tags start `skip + 1` above the target's own tag, so the target line is
    /// never included and disjoint sets can be carved out with different `skip`s.
    pub fn congruent(geometry: &CacheGeometry, target: u64, count: usize, skip: usize) -> Self {
        let (tag, set, _) = geometry.decompose(target);
        let lines = (0..count)
            .map(|k| geometry.line_address(tag.wrapping_add((skip + k + 1) as u64), set))
            .collect();
        Self { lines }
    }

    /// `count` lines congruent with `target` in `inner` whose set in `outer`
    /// differs from the target's.
    ///
    /// Used to prime the private level without disturbing the shared-level
    /// set the remote spy monitors. May return fewer lines when the
    /// geometries leave no such candidate within the search bound.
    pub fn congruent_avoiding(
        inner: &CacheGeometry,
        outer: &CacheGeometry,
        target: u64,
        count: usize,
    ) -> Self {
        let (tag, set, _) = inner.decompose(target);
        let (_, outer_set, _) = outer.decompose(target);
        let lines = (1..=count.saturating_mul(SEARCH_FACTOR) as u64)
            .map(|k| inner.line_address(tag.wrapping_add(k), set))
            .filter(|&line| outer.decompose(line).1 != outer_set)
            .take(count)
            .collect();
        Self { lines }
    }

    /// The member line addresses.
    pub fn lines(&self) -> &[u64] {
        &self.lines
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the set holds no line.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Every `stripes`-th line starting at `index`.
    ///
    /// Splitting one set into `stripes` stripes hands each spy a disjoint share.
    pub fn stripe(&self, index: usize, stripes: usize) -> Self {
        let lines = self
            .lines
            .iter()
            .skip(index)
            .step_by(stripes.max(1))
            .copied()
            .collect();
        Self { lines }
    }

    /// Concatenates two eviction sets.
    pub fn chain(mut self, other: &Self) -> Self {
        self.lines.extend_from_slice(&other.lines);
        self
    }
}
