//! Text trace reader.
//!
//! One event per line:
//!
//! ```text
//! # comment
//! I 0x4014e3        instruction retired
//! R 0x7ff00040      operand read on core 0
//! W 4096 2          operand write on core 2
//! ```
//!
//! Addresses and cores are hexadecimal with a `0x` prefix or decimal.
//! Everything after `#` is ignored.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::simulator::VictimEvent;
use crate::common::addr::VICTIM_CORE;
use crate::common::data::AccessType;
use crate::common::error::TraceError;

/// Reads and parses the trace file at `path`.
///
/// # Errors
///
/// Returns [`TraceError::Io`] when the file cannot be read or
/// [`TraceError::Parse`] on the first malformed line.
pub fn read_trace(path: &Path) -> Result<Vec<VictimEvent>, TraceError> {
    let file = File::open(path)?;
    parse_reader(BufReader::new(file))
}

/// Parses every line of `reader`.
///
/// # Errors
///
/// See [`read_trace`].
pub fn parse_reader<R: BufRead>(reader: R) -> Result<Vec<VictimEvent>, TraceError> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        if let Some(event) = parse_line(&line?, index + 1)? {
            events.push(event);
        }
    }
    Ok(events)
}

/// Parses an in-memory trace.
///
/// # Errors
///
/// Returns [`TraceError::Parse`] on the first malformed line.
pub fn parse_trace(text: &str) -> Result<Vec<VictimEvent>, TraceError> {
    parse_reader(text.as_bytes())
}

/// Parses one line; blank and comment-only lines yield `None`.
///
/// # Errors
///
/// Returns [`TraceError::Parse`] tagged with `number`.
pub fn parse_line(line: &str, number: usize) -> Result<Option<VictimEvent>, TraceError> {
    let content = line.split('#').next().unwrap_or_default();
    let fields: Vec<&str> = content.split_whitespace().collect();
    let error = |message: String| TraceError::Parse {
        line: number,
        message,
    };

    let Some((&kind, operands)) = fields.split_first() else {
        return Ok(None);
    };
    let addr = operands
        .first()
        .ok_or_else(|| error(format!("`{kind}` needs an address")))
        .and_then(|s| parse_number(s).ok_or_else(|| error(format!("bad address `{s}`"))))?;

    let event = match kind {
        "I" | "i" => {
            if operands.len() > 1 {
                return Err(error("instruction takes only an address".to_string()));
            }
            VictimEvent::Instruction(addr)
        }
        "R" | "r" | "W" | "w" => {
            let core = match operands.get(1) {
                Some(s) => parse_number(s)
                    .ok_or_else(|| error(format!("bad core `{s}`")))?
                    as usize,
                None => VICTIM_CORE,
            };
            if operands.len() > 2 {
                return Err(error("too many fields".to_string()));
            }
            let kind = if kind.eq_ignore_ascii_case("W") {
                AccessType::Write
            } else {
                AccessType::Read
            };
            VictimEvent::Memory { addr, kind, core }
        }
        other => return Err(error(format!("unknown event kind `{other}`"))),
    };
    Ok(Some(event))
}

fn parse_number(s: &str) -> Option<u64> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}
