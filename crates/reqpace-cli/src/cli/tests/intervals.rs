//! Tests for `reqpace intervals` parsing and registry edits.

use reqpace_core::config::ReqpaceConfig;
use reqpace_core::interval::{IntervalEntry, IntervalRegistry};

use super::parse;
use crate::cli::commands::{defined_in_config, run_intervals, IntervalsCommand};
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_intervals_list() {
    match parse(&["reqpace", "intervals", "list"]) {
        CliCommand::Intervals {
            command: IntervalsCommand::List,
        } => {}
        _ => panic!("expected Intervals List"),
    }
}

#[test]
fn cli_parse_intervals_set() {
    match parse(&["reqpace", "intervals", "set", "api", "1500"]) {
        CliCommand::Intervals {
            command: IntervalsCommand::Set { name, interval_ms },
        } => {
            assert_eq!(name, "api");
            assert_eq!(interval_ms, 1500);
        }
        _ => panic!("expected Intervals Set"),
    }
}

#[test]
fn cli_parse_intervals_remove_many() {
    match parse(&["reqpace", "intervals", "remove", "a", "b"]) {
        CliCommand::Intervals {
            command: IntervalsCommand::Remove { names },
        } => assert_eq!(names, vec!["a", "b"]),
        _ => panic!("expected Intervals Remove"),
    }
}

#[test]
fn cli_parse_intervals_remove_requires_a_name() {
    assert!(Cli::try_parse_from(["reqpace", "intervals", "remove"]).is_err());
}

#[test]
fn set_then_remove_persists_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("intervals.json");
    let registry = IntervalRegistry::new();

    run_intervals(
        &registry,
        &path,
        &ReqpaceConfig::default(),
        IntervalsCommand::Set {
            name: "api".into(),
            interval_ms: 250,
        },
    )
    .unwrap();
    let loaded = IntervalRegistry::load_from_path(&path).unwrap().unwrap();
    assert_eq!(loaded.get("api"), Some(IntervalEntry::new(250)));

    run_intervals(
        &registry,
        &path,
        &ReqpaceConfig::default(),
        IntervalsCommand::Remove {
            names: vec!["api".into(), "never-registered".into()],
        },
    )
    .unwrap();
    let loaded = IntervalRegistry::load_from_path(&path).unwrap().unwrap();
    assert!(loaded.is_empty());
}

#[test]
fn set_keeps_last_completion() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("intervals.json");
    let registry = IntervalRegistry::with_entries([(
        "api".to_string(),
        IntervalEntry::with_last_completed(1000, 42),
    )]);

    run_intervals(
        &registry,
        &path,
        &ReqpaceConfig::default(),
        IntervalsCommand::Set {
            name: "api".into(),
            interval_ms: 5000,
        },
    )
    .unwrap();
    assert_eq!(
        registry.get("api"),
        Some(IntervalEntry::with_last_completed(5000, 42))
    );
}

#[test]
fn list_on_empty_registry_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("intervals.json");
    run_intervals(
        &IntervalRegistry::new(),
        &path,
        &ReqpaceConfig::default(),
        IntervalsCommand::List,
    ).unwrap();
    assert!(!path.exists());
}

#[test]
fn removed_config_intervals_are_reported() {
    let mut cfg = ReqpaceConfig::default();
    cfg.intervals.insert("api".into(), IntervalEntry::new(1000));
    let names = vec!["api".to_string(), "feed".to_string()];
    assert_eq!(defined_in_config(&names, &cfg), vec!["api"]);
    assert!(defined_in_config(&names, &ReqpaceConfig::default()).is_empty());
}

#[test]
fn removed_config_interval_returns_on_next_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("intervals.json");
    let mut cfg = ReqpaceConfig::default();
    cfg.intervals.insert("api".into(), IntervalEntry::new(1000));
    let registry = crate::cli::load_registry(&cfg, Some(&path)).unwrap();

    run_intervals(
        &registry,
        &path,
        &cfg,
        IntervalsCommand::Remove {
            names: vec!["api".into()],
        },
    )
    .unwrap();
    assert!(!registry.contains("api"));

    let reloaded = crate::cli::load_registry(&cfg, Some(&path)).unwrap();
    assert_eq!(reloaded.get("api"), Some(IntervalEntry::new(1000)));
}
