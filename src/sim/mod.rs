//! Simulation harness, component factory, and trace replay.

/// Component factory and scheduling-policy registry.
pub mod builder;

/// A scheduler and a DRAM module wired through one-cycle latches.
pub mod channel;

/// DDR command-trace loading and replay.
pub mod trace;

pub use builder::{build_channel, build_module, build_scheduler, PolicyRegistry};
pub use channel::{ChannelTick, MemoryChannel};
pub use trace::{Trace, TraceError, TraceReport, TraceRunner};
