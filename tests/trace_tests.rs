//! Integration tests for command-trace replay and the command-line tool.

use std::io::Write;
use std::process::Command as Process;

use pretty_assertions::assert_eq;

use ddr_sim::config::Config;
use ddr_sim::dram::bank::INITIAL_WORD;
use ddr_sim::dram::Constraint;
use ddr_sim::sim::{Trace, TraceError, TraceRunner};

/// Replays `text` on the default GDDR3-600 channel.
fn replay(text: &str) -> Result<ddr_sim::sim::TraceReport, TraceError> {
    let trace = Trace::from_toml_str(text)?;
    let mut runner = TraceRunner::new(&Config::default())?;
    runner.run(&trace)
}

/// Tests the shipped example trace end to end.
#[test]
fn test_basic_trace_replay() {
    let report = replay(include_str!("../traces/basic.toml")).expect("trace replays");

    assert_eq!(report.commands, 7);
    assert_eq!(report.cycles, 64);
    assert_eq!(report.retired_writes, 1);

    let cycles: Vec<u64> = report.replies.iter().map(|r| r.cycle).collect();
    assert_eq!(cycles, vec![38, 42, 63]);

    let mut written = vec![1, 2, 3, 4];
    written.extend([INITIAL_WORD; 4]);
    assert_eq!(report.replies[0].words, written);
    assert_eq!(report.replies[1].words, vec![INITIAL_WORD; 8]);

    let stats = &report.stats;
    assert_eq!(stats.active_commands, 2);
    assert_eq!(stats.read_commands, 3);
    assert_eq!(stats.write_commands, 1);
    assert_eq!(stats.precharge_commands, 1);
    assert_eq!(stats.read_data_cycles, 12);
    assert_eq!(stats.write_data_cycles, 4);
}

/// Tests that a command refused by the timing rules is reported, not executed.
#[test]
fn test_rejected_command() {
    let text = r#"
        [[command]]
        cycle = 0
        op = "active"
        bank = 0
        row = 1

        [[command]]
        cycle = 5
        op = "read"
        bank = 0
        column = 0
    "#;
    match replay(text) {
        Err(TraceError::Rejected {
            cycle,
            command,
            constraint,
        }) => {
            assert_eq!(cycle, 5);
            assert_eq!(command, "READ bank=0 col=0 autopre=no");
            assert_eq!(constraint, Constraint::ActToRead);
        }
        other => panic!("unexpected result {:?}", other.map(|r| r.cycles)),
    }
}

/// Tests the trace validation errors.
#[test]
fn test_trace_validation_errors() {
    let out_of_order = "[[command]]\ncycle = 5\nop = \"active\"\nbank = 0\nrow = 0\n\
                        [[command]]\ncycle = 5\nop = \"active\"\nbank = 1\nrow = 0\n";
    assert!(matches!(
        replay(out_of_order),
        Err(TraceError::OutOfOrder { cycle: 5, previous: 5 })
    ));

    let bank = "[[command]]\ncycle = 0\nop = \"active\"\nbank = 8\nrow = 0\n";
    assert!(matches!(replay(bank), Err(TraceError::BankOutOfRange { bank: 8, .. })));

    let row = "[[command]]\ncycle = 0\nop = \"active\"\nbank = 0\nrow = 4096\n";
    assert!(matches!(replay(row), Err(TraceError::RowOutOfRange { row: 4096, .. })));

    let column = "[[command]]\ncycle = 0\nop = \"read\"\nbank = 0\ncolumn = 508\n";
    assert!(matches!(replay(column), Err(TraceError::ColumnOutOfRange { column: 508, .. })));

    let all = "[[command]]\ncycle = 0\nop = \"precharge\"\n";
    assert!(matches!(replay(all), Err(TraceError::PrechargeAll { cycle: 0 })));

    let long = "[[command]]\ncycle = 0\nop = \"write\"\nbank = 0\ncolumn = 0\ndata = [1,2,3,4,5,6,7,8,9]\n";
    assert!(matches!(replay(long), Err(TraceError::BurstTooLong { words: 9, .. })));

    assert!(matches!(replay("[[command]]\ncycle = 0\nop = \"refresh\"\n"), Err(TraceError::Parse(_))));
}

/// Tests that a dummy tag is reported on idle data pins.
#[test]
fn test_dummy_in_trace() {
    let text = "[[command]]\ncycle = 3\nop = \"dummy\"\nconstraint = \"ActToRead\"\n";
    let report = replay(text).expect("trace replays");
    assert_eq!(report.cycles, 4);
    assert_eq!(report.stats.dummy_commands, 1);
    assert_eq!(report.stats.idle_cycles, 3);
}

/// Tests that an empty trace completes immediately.
#[test]
fn test_empty_trace() {
    let report = replay("").expect("empty trace");
    assert_eq!(report.commands, 0);
    assert_eq!(report.cycles, 1);
    assert!(report.replies.is_empty());
}

/// Tests loading a trace file from disk.
#[test]
fn test_trace_load() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, "[[command]]\ncycle = 2\nop = \"active\"\nbank = 3\nrow = 9\n").expect("write trace");
    let trace = Trace::load(file.path()).expect("valid trace");
    assert_eq!(trace.commands.len(), 1);
    assert_eq!(trace.commands[0].cycle, 2);
}

/// Tests the command-line tool on the shipped trace with JSON output.
#[test]
fn test_cli_json_report() {
    let output = Process::new(env!("CARGO_BIN_EXE_ddrsim"))
        .args(["--trace", "traces/basic.toml", "--config", "configs/gddr3_600.toml", "--json"])
        .output()
        .expect("run ddrsim");
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("JSON report");
    assert_eq!(report["commands"], 7);
    assert_eq!(report["replies"].as_array().map(Vec::len), Some(3));
    assert_eq!(report["stats"]["read_commands"], 3);
}

/// Tests that the command-line tool fails on a rejected trace.
#[test]
fn test_cli_rejected_trace() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, "[[command]]\ncycle = 0\nop = \"read\"\nbank = 0\ncolumn = 0\n").expect("write trace");

    let output = Process::new(env!("CARGO_BIN_EXE_ddrsim"))
        .arg("--trace")
        .arg(file.path())
        .output()
        .expect("run ddrsim");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("READ_WITHOUT_ACTIVE_ROW"));
}
