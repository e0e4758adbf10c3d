//! Error Handling.
//!
//! Two classes of failure exist in the engine:
//!
//! 1. **Caller-contract violations** (issuing a command the timing rules forbid,
//!    draining a queue late, addressing a bank that does not exist). These are
//!    simulator bugs and abort the run through `fatal!` with a diagnostic naming
//!    the component, the operation, and the violated invariant.
//! 2. **Configuration errors**, reported as `ConfigError` at construction time,
//!    before any cycle is simulated.

use thiserror::Error;

use crate::config::SchedulerKind;

/// Aborts the simulation with a uniform diagnostic.
///
/// The message is also emitted through the `log` facade at error level so it
/// reaches the log sink even when the panic is caught by a test harness.
macro_rules! fatal {
    ($component:expr, $operation:expr, $($arg:tt)+) => {{
        let message = format!("{}::{}: {}", $component, $operation, format_args!($($arg)+));
        log::error!("{}", message);
        panic!("{}", message)
    }};
}

/// Errors detected while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML or does not match the schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Only the GDDR3 family is modelled.
    #[error("unsupported memory type '{0}' (supported: gddr3)")]
    UnsupportedMemoryType(String),

    /// The timing profile name is not in the profile table.
    #[error("unknown timing profile '{0}' (supported: 600, perfect, custom)")]
    UnknownProfile(String),

    /// The `custom` profile was selected without supplying the timing values.
    #[error("timing profile 'custom' requires a [timing.custom] table")]
    MissingCustomTiming,

    /// A geometry parameter that must be positive is zero.
    #[error("{0} must be greater than zero")]
    ZeroParameter(&'static str),

    /// Bursts hold at most 32 words.
    #[error("burst_length {0} is out of range (1..=32)")]
    BurstLength(u32),

    /// The data bus must move a whole burst in a whole number of cycles.
    #[error("burst_bytes_per_cycle {bytes_per_cycle} does not evenly divide the {burst_bytes}-byte burst")]
    BurstBandwidth {
        /// Bytes transferred per bus cycle.
        bytes_per_cycle: u32,
        /// Bytes in one burst.
        burst_bytes: u32,
    },

    /// More transactions are reserved for reads than the channel can hold.
    #[error("dedicated_read_transactions ({dedicated}) exceeds max_channel_transactions ({max})")]
    DedicatedReads {
        /// Transactions reserved for reads.
        dedicated: u32,
        /// Total channel transaction slots.
        max: u32,
    },

    /// No scheduling policy is registered for the requested kind.
    #[error("no scheduling policy registered for scheduler kind {0:?}")]
    UnsupportedScheduler(SchedulerKind),
}
