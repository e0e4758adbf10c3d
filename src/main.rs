//! DDR Channel Simulator CLI.
//!
//! Replays a DDR command trace against the timing engine and reports the read
//! replies and data-pin statistics.
//!
//! # Usage
//!
//! ```text
//! ddrsim --trace traces/basic.toml [--config configs/gddr3_600.toml] [--json] [--dump]
//! ```
//!
//! Logging is controlled with `RUST_LOG` (e.g. `RUST_LOG=ddr_sim=debug`); the
//! per-cycle bank state line is emitted at `trace` level when telemetry is on.

use clap::Parser;
use std::process;

extern crate ddr_sim;

use ddr_sim::config::Config;
use ddr_sim::sim::{Trace, TraceRunner};

/// Command-line arguments for the DDR channel simulator.
#[derive(Parser, Debug)]
#[command(author, version, about = "Cycle-accurate DDR channel timing simulator")]
struct Args {
    /// Configuration file; the built-in GDDR3-600 defaults are used when omitted.
    #[arg(short, long)]
    config: Option<String>,

    /// Command trace to replay.
    #[arg(short, long)]
    trace: String,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Print the module state and recent commands after the run.
    #[arg(long)]
    dump: bool,

    /// Log the per-cycle bank state line (requires RUST_LOG=trace).
    #[arg(long)]
    telemetry: bool,
}

/// Main entry point for the DDR channel simulator.
///
/// # Behavior
///
/// 1. **Configuration**: Loads and validates the TOML configuration.
/// 2. **Initialization**: Builds the predictive and physical models.
/// 3. **Replay**: Runs the trace until every reply has been delivered.
/// 4. **Report**: Prints replies and statistics; exits with code 1 on any error.
fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path).unwrap_or_else(|e| {
            eprintln!("[!] {}: {}", path, e);
            process::exit(1);
        }),
        None => Config::default(),
    };
    if args.telemetry {
        config.channel.telemetry = true;
    }

    let trace = Trace::load(&args.trace).unwrap_or_else(|e| {
        eprintln!("[!] {}: {}", args.trace, e);
        process::exit(1);
    });

    let mut runner = TraceRunner::new(&config).unwrap_or_else(|e| {
        eprintln!("[!] invalid configuration: {}", e);
        process::exit(1);
    });

    if !args.json {
        println!("Operating Parameters");
        println!("--------------------");
        println!("{}", runner.module().operating_parameters());
        println!("--------------------");
        println!("[*] Replaying {} commands from {}", trace.commands.len(), args.trace);
    }

    let report = match runner.run(&trace) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("\n[!] TRACE ERROR: {}", e);
            if args.dump {
                eprintln!("{}", runner.module().dump());
            }
            process::exit(1);
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("[!] failed to serialise report: {}", e);
                process::exit(1);
            }
        }
    } else {
        println!("\nRead Replies");
        println!("------------");
        for reply in &report.replies {
            let words: Vec<String> = reply.words.iter().map(|w| format!("{:08x}", w)).collect();
            println!("  @{:<8} {}", reply.cycle, words.join(" "));
        }
        println!(
            "\n[*] {} cycles, {} commands, {} replies, {} writes retired",
            report.cycles,
            report.commands,
            report.replies.len(),
            report.retired_writes
        );
        report.stats.print();
    }

    if args.dump {
        println!("{}", runner.module().dump());
    }
}
