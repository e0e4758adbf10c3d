//! DDR Memory-Channel Timing Engine.
//!
//! This crate models, cycle by cycle, the protocol behaviour of one DRAM module
//! attached to one memory channel of a cycle-accurate GPU simulator. It decides
//! which DDR commands (ACTIVE, READ, WRITE, PRECHARGE) may legally be issued in
//! the current cycle and when their effects become visible.
//!
//! # Architecture
//!
//! * **Rules**: A single pure timing-rule module shared by every model.
//! * **Predictive model**: `ModuleState`, used by schedulers to ask "may I issue X now?".
//! * **Physical model**: `DdrModule`, which owns the bank storage and the data bus.
//! * **Scheduler**: A driver that enforces the per-cycle contract of pluggable policies.
//!
//! # Modules
//!
//! * `common`: Shared types, identifiers, and error handling.
//! * `config`: Configuration loading, validation, and timing profile selection.
//! * `dram`: Bursts, commands, banks, timing rules, and both DRAM models.
//! * `scheduler`: The channel scheduler driver and policy contract.
//! * `sim`: Channel harness, component factory, and command-trace replay.
//! * `stats`: Statistics collection and reporting.

/// Shared types, identifiers, and error handling.
///
/// Provides the cycle and bank identifier types used throughout the engine,
/// the configuration error type, and the uniform fatal-diagnostic macro.
#[macro_use]
pub mod common;

/// Configuration system for the channel, the timing profile, and memory clients.
///
/// Loads and validates TOML configuration files and resolves the named timing
/// profiles of the supported memory family.
pub mod config;

/// DRAM data types and timing models.
///
/// Implements bursts, commands, bank storage, the shared timing rules, the
/// predictive timing model, and the physical executing model.
pub mod dram;

/// Channel scheduler driver and scheduling-policy contract.
///
/// Translates memory transactions into DDR commands and publishes the
/// per-cycle admission state.
pub mod scheduler;

/// Simulation harness, component factory, and trace replay.
///
/// Wires a scheduler to a physical module with one-cycle signal latches and
/// replays DDR command traces against the timing models.
pub mod sim;

/// Statistics collection and reporting.
///
/// Tracks data-pin utilisation, wasted cycles, command counts, and row-hit
/// ratios during simulation.
pub mod stats;
