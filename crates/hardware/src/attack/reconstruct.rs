//! Key reconstruction.
//!
//! Offline combination of spy histories into a recovered exponent. The
//! heuristics are best-effort: the result may be shorter or longer than the
//! true key and can contain undetermined positions.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::spy::SpyAgent;
use crate::config::{AttackConfig, AttackMode};

/// One recovered key symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyBit {
    /// Square-only iteration.
    Zero,
    /// Square-and-multiply iteration.
    One,
    /// The histories do not decide this position.
    Unknown,
}

impl KeyBit {
    const fn symbol(self) -> char {
        match self {
            Self::Zero => '0',
            Self::One => '1',
            Self::Unknown => '?',
        }
    }

    const fn from_bit(bit: bool) -> Self {
        if bit { Self::One } else { Self::Zero }
    }
}

impl fmt::Display for KeyBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A recovered key, most significant symbol first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RecoveredKey(pub Vec<KeyBit>);

impl RecoveredKey {
    /// The symbols.
    pub fn bits(&self) -> &[KeyBit] {
        &self.0
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no symbol was recovered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of undetermined positions.
    pub fn unknowns(&self) -> usize {
        self.0.iter().filter(|&&b| b == KeyBit::Unknown).count()
    }
}

impl fmt::Display for RecoveredKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in &self.0 {
            write!(f, "{bit}")?;
        }
        Ok(())
    }
}

/// Error parsing a key string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("invalid key symbol {0:?}, expected 0, 1 or ?")]
pub struct InvalidKeySymbol(pub char);

impl FromStr for RecoveredKey {
    type Err = InvalidKeySymbol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| match c {
                '0' => Ok(KeyBit::Zero),
                '1' => Ok(KeyBit::One),
                '?' => Ok(KeyBit::Unknown),
                other => Err(InvalidKeySymbol(other)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

/// Multi-spy rule over `N` hit histories.
///
/// For each index `i`, with `c` the number of agents that hit:
/// - `c == N` gives `0`;
/// - the previous index all hit and this one did not gives `1`;
/// - even `i` with the first agent missing, or odd `i` with the last agent
///   missing, gives `1`;
/// - anything else is undetermined.
///
/// The output is as long as the longest history; positions some history does
/// not reach are undetermined.
pub fn multi_spy(histories: &[&[bool]]) -> RecoveredKey {
    let (Some(first), Some(last)) = (histories.first(), histories.last()) else {
        return RecoveredKey::default();
    };
    let length = histories.iter().map(|h| h.len()).max().unwrap_or(0);
    let agents = histories.len();

    let mut prev_all = true;
    let mut key = Vec::with_capacity(length);
    for i in 0..length {
        if histories.iter().any(|h| h.len() <= i) {
            key.push(KeyBit::Unknown);
            prev_all = false;
            continue;
        }

        let hits = histories.iter().filter(|h| h[i]).count();
        let all = hits == agents;
        let bit = if all {
            KeyBit::Zero
        } else if prev_all {
            KeyBit::One
        } else if (i % 2 == 0 && !first[i]) || (i % 2 == 1 && !last[i]) {
            KeyBit::One
        } else {
            KeyBit::Unknown
        };
        prev_all = all;
        key.push(bit);
    }
    RecoveredKey(key)
}

/// Shared-L2 rule over the prober's hit flags.
///
/// Pairs are read from index 4 in steps of two: `(true, false)` is a multiply
/// round. The leading exponent bit is always set, so a `1` is appended.
pub fn shared_l2(hits: &[bool]) -> RecoveredKey {
    let mut key: Vec<KeyBit> = hits
        .get(4..)
        .unwrap_or_default()
        .chunks_exact(2)
        .map(|pair| KeyBit::from_bit(pair[0] && !pair[1]))
        .collect();
    key.push(KeyBit::One);
    RecoveredKey(key)
}

/// Applies the rule matching the configured attack to a set of agents.
#[derive(Clone, Copy, Debug)]
pub struct KeyReconstructor<'a> {
    attack: &'a AttackConfig,
}

impl<'a> KeyReconstructor<'a> {
    /// Creates a reconstructor for `attack`.
    pub const fn new(attack: &'a AttackConfig) -> Self {
        Self { attack }
    }

    /// Reconstructs the key from the agents' histories.
    ///
    /// Shared-L2 reads agent 1 only; a missing agent yields just the
    /// trailing leading-one.
    pub fn reconstruct(&self, agents: &[SpyAgent]) -> RecoveredKey {
        match self.attack.mode {
            AttackMode::MultiSpy => {
                let histories: Vec<&[bool]> =
                    agents.iter().map(|a| a.history().hits.as_slice()).collect();
                multi_spy(&histories)
            }
            AttackMode::SharedL2 => {
                let hits = agents
                    .iter()
                    .find(|a| a.id() == 1)
                    .map(|a| a.history().hits.as_slice())
                    .unwrap_or_default();
                shared_l2(hits)
            }
        }
    }
}

/// Keys from repeated runs folded into one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergedKey {
    /// The merged key.
    pub key: RecoveredKey,
    /// Positions where a later key disagreed with an already decided bit.
    pub conflicts: Vec<usize>,
}

/// Folds partial keys together.
///
/// The first key fixes the length. Later keys fill undetermined positions;
/// symbols past the fixed length are ignored and disagreements with decided
/// bits are reported without overwriting them.
pub fn merge_partial_keys(keys: &[RecoveredKey]) -> MergedKey {
    let Some((first, rest)) = keys.split_first() else {
        return MergedKey::default();
    };

    let mut merged = first.0.clone();
    let mut conflicts = Vec::new();
    for key in rest {
        for (i, (slot, &bit)) in merged.iter_mut().zip(&key.0).enumerate() {
            match (*slot, bit) {
                (_, KeyBit::Unknown) => {}
                (KeyBit::Unknown, decided) => *slot = decided,
                (held, decided) if held != decided => conflicts.push(i),
                _ => {}
            }
        }
    }
    MergedKey {
        key: RecoveredKey(merged),
        conflicts,
    }
}

/// Accuracy of a recovered key against the true one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyScore {
    /// Symbols matching the true bit at the aligned position.
    pub hits: usize,
    /// Extra repeats of the previous true bit, skipped without advancing.
    pub duplicates: usize,
    /// Wrong symbols.
    pub errors: usize,
    /// Undetermined symbols.
    pub unknowns: usize,
    /// Recovered symbols left over after the true key was exhausted.
    pub overrun: usize,
}

impl KeyScore {
    /// Walks `recovered` against `original`, tolerating repeated symbols.
    ///
    /// A symbol equal to the current true bit is a hit. A wrong symbol that
    /// repeats the previous true bit is a duplicate and does not consume a
    /// true bit; any other wrong symbol is an error.
    pub fn aligned(recovered: &RecoveredKey, original: &[bool]) -> Self {
        let mut score = Self::default();
        if original.is_empty() {
            score.overrun = recovered.len();
            return score;
        }

        let mut pos = 0;
        for (i, &bit) in recovered.0.iter().enumerate() {
            match bit {
                KeyBit::Unknown => {
                    score.unknowns += 1;
                    pos += 1;
                }
                b if b == KeyBit::from_bit(original[pos]) => {
                    score.hits += 1;
                    pos += 1;
                }
                b if pos > 0 && b == KeyBit::from_bit(original[pos - 1]) => {
                    score.duplicates += 1;
                }
                _ => {
                    score.errors += 1;
                    pos += 1;
                }
            }
            if pos >= original.len() {
                score.overrun = recovered.len() - i - 1;
                break;
            }
        }
        score
    }

    /// Number of positions equal to `original` once `recovered` is cut to its
    /// last `original.len()` symbols and left-padded with zeros.
    pub fn positional_matches(recovered: &RecoveredKey, original: &[bool]) -> usize {
        let n = original.len();
        let tail = &recovered.0[recovered.len().saturating_sub(n)..];
        let padding = n - tail.len();
        original
            .iter()
            .enumerate()
            .filter(|&(i, &bit)| {
                let symbol = if i < padding {
                    KeyBit::Zero
                } else {
                    tail[i - padding]
                };
                symbol == KeyBit::from_bit(bit)
            })
            .count()
    }
}

/// Parses a `0`/`1` string into bits.
///
/// # Errors
///
/// Returns the first character that is neither `0` nor `1`.
pub fn parse_bits(s: &str) -> Result<Vec<bool>, InvalidKeySymbol> {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '0' => Ok(false),
            '1' => Ok(true),
            other => Err(InvalidKeySymbol(other)),
        })
        .collect()
}
