//! DRAM Data Types and Timing Models.
//!
//! Leaf-to-root: `burst` and `command` are the values exchanged on the
//! channel, `bank` is the storage array, `rules` holds the timing-constraint
//! arithmetic, and `state` (predictive) plus `module` (physical) are the two
//! models built on top of those rules.

/// Per-bank storage array with one open row.
pub mod bank;

/// Fixed-capacity word vectors with per-word byte masks.
pub mod burst;

/// DDR commands and their ownership rules.
pub mod command;

/// Timing-constraint and protocol-constraint identifiers.
pub mod constraint;

/// The physical executing model of a DRAM module.
pub mod module;

/// Data-pin activity items produced by the physical model.
pub mod pins;

/// Timing rules shared by the predictive and physical models.
pub mod rules;

/// The predictive timing model used by schedulers.
pub mod state;

/// Timing parameters and the named profile table.
pub mod timing;

pub use bank::Bank;
pub use burst::Burst;
pub use command::{Command, CommandKind, CommandMask, CommandOp, PrechargeTarget};
pub use constraint::{Constraint, ProtocolConstraint};
pub use module::{DdrModule, ModuleOutput};
pub use pins::DataPinItem;
pub use rules::BankStateId;
pub use state::ModuleState;
pub use timing::{TimingParams, TimingValues};
