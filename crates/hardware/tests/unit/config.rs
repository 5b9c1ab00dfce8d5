//! # Configuration Tests
//!
//! Defaults, JSON deserialization and validation.

use pretty_assertions::assert_eq;
use rstest::rstest;

use sharpsim_core::common::ConfigError;
use sharpsim_core::config::*;

use crate::common::{cache, config_with, tiny_l2, tiny_l3};

#[test]
fn test_cache_defaults_match_i7_shape() {
    let config = Config::default();
    assert_eq!(
        config.cache.l2,
        CacheConfig {
            size_kb: 256,
            line_size: 64,
            miss_penalty: 100,
            associativity: 4,
            policy: ReplacementPolicy::Lru,
        }
    );
    assert_eq!(
        config.cache.l3,
        CacheConfig {
            size_kb: 16384,
            line_size: 64,
            miss_penalty: 100,
            associativity: 16,
            policy: ReplacementPolicy::Sharp,
        }
    );
}

#[test]
fn test_attack_and_alarm_defaults() {
    let config = Config::default();
    assert_eq!(config.attack.mode, AttackMode::MultiSpy);
    assert_eq!(config.attack.spy_count, 4);
    assert!((config.attack.activation_probability - 0.9).abs() < f64::EPSILON);
    assert_eq!(config.attack.square_target, 0x4014e3);
    assert_eq!(config.attack.multiply_target, 0x4016dc);
    assert_eq!(config.attack.wait_time, 30);
    assert_eq!(config.attack.miss_threshold, None);
    assert_eq!(config.alarm, AlarmConfig { window: 10_000, threshold: 100 });
    assert_eq!(config.seed, 0);
    assert_eq!(config.cores, None);
}

#[test]
fn test_default_config_is_valid() {
    assert_eq!(Config::default().validate(), Ok(()));
}

#[test]
fn test_core_count_follows_attack_mode() {
    let mut config = Config::default();
    assert_eq!(config.core_count(), 5);

    config.attack.mode = AttackMode::SharedL2;
    assert_eq!(config.core_count(), 2);
    assert_eq!(config.attack.agent_count(), 2);

    config.cores = Some(8);
    assert_eq!(config.core_count(), 8);
}

#[test]
fn test_empty_json_yields_defaults() {
    let config = Config::from_json("{}").unwrap();
    assert_eq!(config.cache.l2, CacheConfig::l2_default());
    assert_eq!(config.cache.l3, CacheConfig::l3_default());
    assert_eq!(config.attack.spy_count, 4);
}

#[test]
fn test_partial_level_fills_line_and_penalty() {
    let json = r#"{ "cache": { "l2": { "size_kb": 128, "associativity": 8 } } }"#;
    let config = Config::from_json(json).unwrap();
    assert_eq!(config.cache.l2.size_kb, 128);
    assert_eq!(config.cache.l2.associativity, 8);
    assert_eq!(config.cache.l2.line_size, 64);
    assert_eq!(config.cache.l2.miss_penalty, 100);
    assert_eq!(config.cache.l2.policy, ReplacementPolicy::Lru);
    // Untouched sibling keeps its own default.
    assert_eq!(config.cache.l3, CacheConfig::l3_default());
}

#[rstest]
#[case::upper("SHARP", ReplacementPolicy::Sharp)]
#[case::lower("sharp", ReplacementPolicy::Sharp)]
#[case::pascal("Lru", ReplacementPolicy::Lru)]
#[case::lru_upper("LRU", ReplacementPolicy::Lru)]
fn test_policy_names(#[case] name: &str, #[case] expected: ReplacementPolicy) {
    let json = format!(r#"{{ "cache": {{ "l3": {{ "size_kb": 64, "associativity": 4, "policy": "{name}" }} }} }}"#);
    let config = Config::from_json(&json).unwrap();
    assert_eq!(config.cache.l3.policy, expected);
}

#[rstest]
#[case::pascal("MultiSpy", AttackMode::MultiSpy)]
#[case::snake("multi_spy", AttackMode::MultiSpy)]
#[case::shared_pascal("SharedL2", AttackMode::SharedL2)]
#[case::shared_snake("shared_l2", AttackMode::SharedL2)]
fn test_attack_mode_names(#[case] name: &str, #[case] expected: AttackMode) {
    let json = format!(r#"{{ "attack": {{ "mode": "{name}" }} }}"#);
    assert_eq!(Config::from_json(&json).unwrap().attack.mode, expected);
}

#[test]
fn test_full_attack_section() {
    let json = r#"{
        "attack": {
            "mode": "SharedL2",
            "activation_probability": 0.25,
            "square_target": 4198627,
            "multiply_target": 4199132,
            "wait_time": 12,
            "warmup_delay": 3,
            "round_delay": 9,
            "miss_threshold": 50
        },
        "alarm": { "window": 500, "threshold": 7 },
        "cores": 4,
        "seed": 99
    }"#;
    let config = Config::from_json(json).unwrap();
    assert_eq!(config.attack.mode, AttackMode::SharedL2);
    assert_eq!(config.attack.square_target, 0x4010e3);
    assert_eq!(config.attack.multiply_target, 0x4012dc);
    assert_eq!(config.attack.wait_time, 12);
    assert_eq!(config.attack.warmup_delay, 3);
    assert_eq!(config.attack.round_delay, 9);
    assert_eq!(config.attack.miss_threshold, Some(50));
    assert_eq!(config.alarm, AlarmConfig { window: 500, threshold: 7 });
    assert_eq!(config.cores, Some(4));
    assert_eq!(config.seed, 99);
}

#[test]
fn test_malformed_json_is_rejected() {
    assert!(Config::from_json("{ \"cache\": ").is_err());
    assert!(Config::from_json(r#"{ "attack": { "mode": "Bogus" } }"#).is_err());
}

#[rstest]
#[case::negative(-0.1)]
#[case::above_one(1.5)]
fn test_probability_out_of_range(#[case] p: f64) {
    let mut config = Config::default();
    config.attack.activation_probability = p;
    assert_eq!(config.validate(), Err(ConfigError::InvalidProbability(p)));
}

#[rstest]
#[case::never(0.0)]
#[case::always(1.0)]
fn test_probability_bounds_are_inclusive(#[case] p: f64) {
    let mut config = Config::default();
    config.attack.activation_probability = p;
    assert_eq!(config.validate(), Ok(()));
}

#[test]
fn test_too_few_cores() {
    let mut config = Config::default();
    config.cores = Some(2);
    assert_eq!(
        config.validate(),
        Err(ConfigError::TooFewCores {
            cores: 2,
            required: 5
        })
    );
}

#[test]
fn test_multi_spy_needs_a_spy() {
    let mut config = config_with(tiny_l2(), tiny_l3(), 1);
    config.attack.spy_count = 0;
    assert_eq!(config.validate(), Err(ConfigError::NoSpies));
}

#[test]
fn test_zero_alarm_window() {
    let mut config = Config::default();
    config.alarm.window = 0;
    assert_eq!(
        config.validate(),
        Err(ConfigError::ZeroField {
            level: "alarm",
            field: "window"
        })
    );
}

#[test]
fn test_original_l3_size_is_rejected() {
    // 12 MB over 64 B x 16 ways is 12288 sets.
    let config = config_with(
        CacheConfig::l2_default(),
        cache(12288, 16, ReplacementPolicy::Sharp),
        5,
    );
    assert_eq!(
        config.validate(),
        Err(ConfigError::SetCountNotPowerOfTwo {
            level: "L3",
            sets: 12288
        })
    );
}
