//! CLI parse and command tests.

use super::{Cli, CliCommand};
use clap::Parser;

pub(super) fn parse(args: &[&str]) -> CliCommand {
    let cli = Cli::try_parse_from(args).unwrap();
    cli.command
}

mod intervals;

#[test]
fn load_registry_prefers_persisted_intervals() {
    use reqpace_core::config::ReqpaceConfig;
    use reqpace_core::interval::{IntervalEntry, IntervalRegistry};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("intervals.json");
    IntervalRegistry::with_entries([(
        "api".to_string(),
        IntervalEntry::with_last_completed(2000, 7),
    )])
    .save_to_path(&path)
    .unwrap();

    let mut cfg = ReqpaceConfig::default();
    cfg.intervals.insert("api".into(), IntervalEntry::with_last_completed(500, 9));
    cfg.intervals.insert("other".into(), IntervalEntry::new(100));

    let registry = super::load_registry(&cfg, Some(&path)).unwrap();
    assert_eq!(
        registry.get("api"),
        Some(IntervalEntry::with_last_completed(2000, 9))
    );
    assert_eq!(registry.get("other"), Some(IntervalEntry::new(100)));
}

#[test]
fn load_registry_without_store_uses_config_only() {
    use reqpace_core::config::ReqpaceConfig;
    use reqpace_core::interval::IntervalEntry;

    let mut cfg = ReqpaceConfig::default();
    cfg.intervals.insert("api".into(), IntervalEntry::new(100));
    let registry = super::load_registry(&cfg, None).unwrap();
    assert_eq!(registry.identities(), vec!["api".to_string()]);
}
