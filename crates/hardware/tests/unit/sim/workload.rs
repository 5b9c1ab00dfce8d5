//! Synthetic Victim Tests.

use sharpsim_core::SquareMultiply;
use sharpsim_core::common::AccessType;
use sharpsim_core::config::AttackConfig;
use sharpsim_core::sim::VictimEvent;

fn fetches(events: &[VictimEvent]) -> Vec<u64> {
    events
        .iter()
        .filter_map(|e| match *e {
            VictimEvent::Instruction(addr) => Some(addr),
            VictimEvent::Memory { .. } => None,
        })
        .collect()
}

#[test]
fn instruction_count_matches_stream() {
    let attack = AttackConfig::default();
    let victim = SquareMultiply::new(vec![true, false, true, true, false], &attack);
    let events = victim.events();
    assert_eq!(fetches(&events).len(), victim.instruction_count());
}

#[test]
fn multiply_routine_runs_only_for_set_bits() {
    let attack = AttackConfig::default();
    let victim = SquareMultiply::new(vec![true, false, true, true, false], &attack);
    let addrs = fetches(&victim.events());
    let entries = |target| addrs.iter().filter(|&&a| a == target).count();
    assert_eq!(entries(attack.square_target), 5);
    assert_eq!(entries(attack.multiply_target), 3);
}

#[test]
fn each_iteration_starts_with_square() {
    let attack = AttackConfig::default();
    let victim = SquareMultiply::new(vec![false, true], &attack).with_routine_len(2);
    let addrs = fetches(&victim.events());
    // square (2) + loop (4), then square (2) + multiply (2) + loop (4).
    assert_eq!(addrs.len(), 14);
    assert_eq!(addrs[0], attack.square_target);
    assert_eq!(addrs[1], attack.square_target + 4);
    assert_eq!(addrs[6], attack.square_target);
    assert_eq!(addrs[8], attack.multiply_target);
}

#[test]
fn operands_are_victim_reads() {
    let attack = AttackConfig::default();
    let victim = SquareMultiply::new(vec![true], &attack);
    for event in victim.events() {
        if let VictimEvent::Memory { kind, core, .. } = event {
            assert_eq!(kind, AccessType::Read);
            assert_eq!(core, 0);
        }
    }
}

#[test]
fn routine_length_is_at_least_one() {
    let attack = AttackConfig::default();
    let victim = SquareMultiply::new(vec![true, true], &attack).with_routine_len(0);
    // (2 squares + 2 multiplies) x 1 + 2 loops x 4.
    assert_eq!(victim.instruction_count(), 12);
    assert!(SquareMultiply::new(Vec::new(), &attack).events().is_empty());
}
