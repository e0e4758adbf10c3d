//! Channel Scheduler.
//!
//! The scheduler sits between the memory controller and one DRAM module. It
//! receives memory transactions, turns them into DDR commands, and publishes
//! once per cycle which kinds of transactions it can accept. The decisions are
//! made by a pluggable `SchedulingPolicy`; the `ChannelScheduler` driver runs
//! the policy and enforces the per-cycle contract around it.

/// The scheduler driver and the policy trait.
pub mod channel;

/// Per-cycle services offered to policies.
pub mod context;

/// Admission state published to the memory controller.
pub mod state;

/// Memory transactions and requesting GPU units.
pub mod transaction;

pub use channel::{ChannelScheduler, SchedulerOutput, SchedulingPolicy};
pub use context::SchedulerContext;
pub use state::{Admission, SchedulerState};
pub use transaction::{ChannelTransaction, RequesterUnit, TransactionKind};
