//! Report Rendering Tests.

use sharpsim_core::config::{Config, ReplacementPolicy};
use sharpsim_core::stats::{LevelStats, RunReport, SECTIONS};
use sharpsim_core::{Simulator, SquareMultiply};

fn report() -> RunReport {
    let mut config = Config::default();
    config.seed = 3;
    let victim = SquareMultiply::new(vec![true, false, true, true, false, true], &config.attack);
    Simulator::new(config).unwrap().run(victim.events()).unwrap()
}

fn render(report: &RunReport, sections: &[&str]) -> String {
    let sections: Vec<String> = sections.iter().map(|s| (*s).to_string()).collect();
    let mut out = Vec::new();
    report.write_sections(&mut out, &sections).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn all_sections_by_default() {
    let report = report();
    let text = render(&report, &[]);
    for heading in [
        "SHARP CACHE SIMULATION STATISTICS",
        "ALARM MONITOR",
        "MEMORY HIERARCHY",
        "SPY AGENTS",
    ] {
        assert!(text.contains(heading), "missing {heading}");
    }
    assert!(text.contains(&format!("Combined Key: {}", report.key)));
    assert!(text.contains("spy1"));
    assert!(text.contains("core0"));
}

#[test]
fn section_filter_selects_only_named() {
    let text = render(&report(), &["memory"]);
    assert!(text.contains("MEMORY HIERARCHY"));
    assert!(text.contains("inclusion.back_inval"));
    assert!(!text.contains("ALARM MONITOR"));
    assert!(!text.contains("Combined Key"));
}

#[test]
fn every_known_section_renders_something() {
    let report = report();
    let banner_only = render(&report, &["none-of-these"]);
    for section in SECTIONS {
        assert!(render(&report, &[section]).len() > banner_only.len(), "{section}");
    }
}

#[test]
fn report_matches_run_counters() {
    let report = report();
    assert_eq!(report.cores.len(), 5);
    assert_eq!(report.l3.policy, ReplacementPolicy::Sharp);
    assert_eq!(report.l2.policy, ReplacementPolicy::Lru);
    assert!(report.l3.accesses >= report.l2.misses);
    assert_eq!(
        report.forced_evictions(),
        report.cores.iter().map(|c| c.forced_evictions).sum::<u64>()
    );
}

#[test]
fn untouched_level_has_zero_miss_rate() {
    let level = LevelStats::default();
    assert_eq!(level.hits(), 0);
    assert!(level.miss_rate().abs() < f64::EPSILON);

    let half = LevelStats {
        accesses: 4,
        misses: 2,
        policy: ReplacementPolicy::Lru,
    };
    assert_eq!(half.hits(), 2);
    assert!((half.miss_rate() - 50.0).abs() < 1e-9);
}
