//! Integration tests for configuration loading and validation.

use std::io::Write;

use pretty_assertions::assert_eq;
use rstest::rstest;

use ddr_sim::common::ConfigError;
use ddr_sim::config::{Config, PagePolicy, QueueTopology, SchedulerKind};
use ddr_sim::dram::timing::GDDR3_600;
use ddr_sim::dram::TimingParams;

/// Tests that the built-in defaults describe a valid GDDR3-600 channel.
#[test]
fn test_default_config() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.channel.banks, 8);
    assert_eq!(config.channel.page_policy, PagePolicy::OpenPage);
    assert_eq!(config.channel.scheduler, SchedulerKind::Fifo);
    assert_eq!(config.channel.queue_topology, QueueTopology::Shared);
    assert_eq!(
        config.timing_params().expect("default profile"),
        TimingParams::new(GDDR3_600, 8, 8)
    );
}

/// Tests that an empty file falls back to every default.
#[test]
fn test_empty_config_uses_defaults() {
    let config = Config::from_toml_str("").expect("empty config is valid");
    assert_eq!(config.channel.rows, 4096);
    assert_eq!(config.channel.columns, 512);
    assert_eq!(config.timing.profile, "600");
    assert_eq!(config.clients.texture_units, 4);
}

/// Tests the shipped GDDR3-600 configuration.
#[test]
fn test_shipped_gddr3_config() {
    let config = Config::from_toml_str(include_str!("../configs/gddr3_600.toml")).expect("valid config");
    let params = config.timing_params().expect("valid profile");
    assert_eq!(params.cas_latency, 9);
    assert_eq!(params.burst_transmission_time(), 4);
}

/// Tests the shipped custom-timing configuration.
#[test]
fn test_shipped_custom_config() {
    let config = Config::from_toml_str(include_str!("../configs/custom_timing.toml")).expect("valid config");
    assert_eq!(config.channel.banks, 4);
    assert_eq!(config.channel.page_policy, PagePolicy::ClosePage);
    assert_eq!(config.channel.scheduler, SchedulerKind::BankQueueFifo);
    assert_eq!(config.channel.queue_topology, QueueTopology::PerBank);

    let params = config.timing_params().expect("custom profile");
    assert_eq!(params.t_rcd, 15);
    assert_eq!(params.write_latency, 5);
    assert_eq!(params.burst_transmission_time(), 8);
}

/// Tests that the legacy scheduler spellings are accepted.
#[rstest]
#[case("RWFifo", SchedulerKind::RwFifo)]
#[case("RwFifo", SchedulerKind::RwFifo)]
#[case("BankRWQueueFifo", SchedulerKind::BankRwQueueFifo)]
#[case("LookAhead", SchedulerKind::LookAhead)]
fn test_scheduler_names(#[case] name: &str, #[case] expected: SchedulerKind) {
    let text = format!("[channel]\nscheduler = \"{}\"\n", name);
    let config = Config::from_toml_str(&text).expect("valid scheduler name");
    assert_eq!(config.channel.scheduler, expected);
}

/// Tests the validation errors and their messages.
#[rstest]
#[case("[channel]\nbanks = 0", "banks must be greater than zero")]
#[case("[channel]\nmax_channel_transactions = 0", "max_channel_transactions must be greater than zero")]
#[case("[channel]\nburst_length = 33", "burst_length 33 is out of range (1..=32)")]
#[case(
    "[channel]\nburst_bytes_per_cycle = 12",
    "burst_bytes_per_cycle 12 does not evenly divide the 32-byte burst"
)]
#[case(
    "[channel]\ndedicated_read_transactions = 9",
    "dedicated_read_transactions (9) exceeds max_channel_transactions (8)"
)]
#[case("[timing]\nmemory_type = \"ddr4\"", "unsupported memory type 'ddr4' (supported: gddr3)")]
#[case("[timing]\nprofile = \"700\"", "unknown timing profile '700' (supported: 600, perfect, custom)")]
#[case("[timing]\nprofile = \"custom\"", "timing profile 'custom' requires a [timing.custom] table")]
fn test_validation_errors(#[case] text: &str, #[case] message: &str) {
    let err = Config::from_toml_str(text).expect_err("invalid config");
    assert_eq!(err.to_string(), message);
}

/// Tests that malformed TOML is reported as a parse error.
#[test]
fn test_parse_error() {
    let err = Config::from_toml_str("[channel\nbanks = 2").expect_err("malformed");
    assert!(matches!(err, ConfigError::Parse(_)));

    let err = Config::from_toml_str("[channel]\npage_policy = \"Sometimes\"").expect_err("bad enum");
    assert!(matches!(err, ConfigError::Parse(_)));
}

/// Tests that an incomplete custom timing table is rejected.
#[test]
fn test_incomplete_custom_timing() {
    let text = "[timing]\nprofile = \"custom\"\n[timing.custom]\nt_rrd = 1\n";
    let err = Config::from_toml_str(text).expect_err("missing fields");
    assert!(matches!(err, ConfigError::Parse(_)));
}

/// Tests loading a configuration from disk.
#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[channel]\nbanks = 2\n[timing]\nprofile = \"perfect\"").expect("write config");

    let config = Config::load(file.path()).expect("valid file");
    assert_eq!(config.channel.banks, 2);
    let params = config.timing_params().expect("perfect profile");
    assert_eq!(params.t_rcd, 0);
    assert_eq!(params.cas_latency, 0);
}

/// Tests that a missing file is reported as an I/O error.
#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = Config::load(dir.path().join("absent.toml")).expect_err("no file");
    assert!(matches!(err, ConfigError::Io(_)));
}
