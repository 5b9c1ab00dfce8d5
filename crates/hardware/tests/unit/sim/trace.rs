//! Trace Parser Tests.

use std::path::Path;

use pretty_assertions::assert_eq;
use rstest::rstest;

use sharpsim_core::common::{AccessType, TraceError};
use sharpsim_core::sim::VictimEvent;
use sharpsim_core::sim::trace::{parse_line, parse_trace, read_trace};

#[test]
fn parses_mixed_trace() {
    let text = "\
# victim trace
I 0x4014e3
R 0x7ff00040          # operand
W 4096 2

i 0X10
";
    let events = parse_trace(text).unwrap();
    assert_eq!(
        events,
        vec![
            VictimEvent::Instruction(0x4014e3),
            VictimEvent::Memory {
                addr: 0x7ff0_0040,
                kind: AccessType::Read,
                core: 0
            },
            VictimEvent::Memory {
                addr: 4096,
                kind: AccessType::Write,
                core: 2
            },
            VictimEvent::Instruction(0x10),
        ]
    );
}

#[rstest]
#[case::blank("")]
#[case::spaces("   \t")]
#[case::comment("# nothing here")]
fn skips_empty_lines(#[case] line: &str) {
    assert!(parse_line(line, 1).unwrap().is_none());
}

#[rstest]
#[case::unknown_kind("X 0x10", "unknown event kind")]
#[case::missing_address("R", "needs an address")]
#[case::bad_address("I 0xzz", "bad address")]
#[case::bad_core("R 0x10 core1", "bad core")]
#[case::extra_instruction_field("I 0x10 3", "only an address")]
#[case::extra_memory_field("W 0x10 1 2", "too many fields")]
fn rejects_malformed_line(#[case] line: &str, #[case] fragment: &str) {
    match parse_line(line, 7) {
        Err(TraceError::Parse { line, message }) => {
            assert_eq!(line, 7);
            assert!(message.contains(fragment), "{message}");
        }
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn error_carries_line_number() {
    let text = "I 0x10\nI 0x14\nQ 1\n";
    match parse_trace(text) {
        Err(TraceError::Parse { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn missing_file_is_io_error() {
    let result = read_trace(Path::new("/nonexistent/sharpsim/trace.txt"));
    assert!(matches!(result, Err(TraceError::Io(_))));
}
