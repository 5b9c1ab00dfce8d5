//! Synthetic square-and-multiply victim.
//!
//! Generates the event stream of a left-to-right modular exponentiation:
//! every exponent bit runs the square routine, and set bits additionally run
//! the multiply routine. Each routine is a straight run of instructions
//! starting at its entry address, each reading one operand limb. A short loop
//! stub separates iterations.

use super::simulator::VictimEvent;
use crate::common::addr::VICTIM_CORE;
use crate::common::data::AccessType;
use crate::config::AttackConfig;

/// Instructions per square or multiply routine.
pub const DEFAULT_ROUTINE_LEN: usize = 24;

/// Instructions in the loop stub between iterations.
const LOOP_LEN: usize = 4;

/// Loop stub entry.
const LOOP_BASE: u64 = 0x0040_1200;

/// Operand buffer base; limbs are one line apart.
const OPERAND_BASE: u64 = 0x7ff0_0000;

/// Distinct operand limbs touched by a routine.
const LIMBS: u64 = 8;

/// Instruction width.
const INSN_BYTES: u64 = 4;

/// A square-and-multiply victim for a fixed exponent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SquareMultiply {
    key: Vec<bool>,
    square_target: u64,
    multiply_target: u64,
    routine_len: usize,
}

impl SquareMultiply {
    /// A victim exponentiating with `key` (most significant bit first) at the
    /// routine addresses of `attack`.
    pub fn new(key: Vec<bool>, attack: &AttackConfig) -> Self {
        Self {
            key,
            square_target: attack.square_target,
            multiply_target: attack.multiply_target,
            routine_len: DEFAULT_ROUTINE_LEN,
        }
    }

    /// Overrides the routine length (at least one instruction).
    #[must_use]
    pub fn with_routine_len(mut self, routine_len: usize) -> Self {
        self.routine_len = routine_len.max(1);
        self
    }

    /// The exponent.
    pub fn key(&self) -> &[bool] {
        &self.key
    }

    /// Victim instructions the stream will retire.
    pub fn instruction_count(&self) -> usize {
        let ones = self.key.iter().filter(|&&b| b).count();
        (self.key.len() + ones) * self.routine_len + self.key.len() * LOOP_LEN
    }

    /// The full event stream.
    pub fn events(&self) -> Vec<VictimEvent> {
        let mut events = Vec::with_capacity(self.instruction_count() * 2);
        for &bit in &self.key {
            self.routine(self.square_target, &mut events);
            if bit {
                self.routine(self.multiply_target, &mut events);
            }
            for k in 0..LOOP_LEN as u64 {
                events.push(VictimEvent::Instruction(LOOP_BASE + k * INSN_BYTES));
            }
        }
        events
    }

    fn routine(&self, entry: u64, events: &mut Vec<VictimEvent>) {
        for k in 0..self.routine_len as u64 {
            events.push(VictimEvent::Instruction(entry + k * INSN_BYTES));
            events.push(VictimEvent::Memory {
                addr: OPERAND_BASE + (k % LIMBS) * 64,
                kind: AccessType::Read,
                core: VICTIM_CORE,
            });
        }
    }
}
