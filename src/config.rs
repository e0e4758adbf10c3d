//! Configuration.
//!
//! The engine is configured from a TOML file with three sections:
//!
//! * `[channel]`: module geometry, burst shape, and scheduler selection.
//! * `[timing]`: memory family and timing profile (`600`, `perfect`, or `custom`).
//! * `[clients]`: how many instances of each multi-instance GPU unit may issue requests.
//!
//! Every field has a default, so an empty file describes a GDDR3-600 channel
//! with eight banks and a FIFO scheduler.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::common::ConfigError;
use crate::dram::timing::{self, TimingParams, TimingValues};

const DEFAULT_BANKS: u32 = 8;
const DEFAULT_ROWS: u32 = 4096;
const DEFAULT_COLUMNS: u32 = 512;
const DEFAULT_BURST_LENGTH: u32 = 8;
const DEFAULT_BURST_BYTES_PER_CYCLE: u32 = 8;
const DEFAULT_MAX_TRANSACTIONS: u32 = 8;

const DEFAULT_MEMORY_TYPE: &str = "gddr3";
const DEFAULT_PROFILE: &str = "600";

const DEFAULT_STREAMER_LOADER_UNITS: u32 = 1;
const DEFAULT_TEXTURE_UNITS: u32 = 4;
const DEFAULT_STAMP_UNITS: u32 = 1;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub clients: ClientsConfig,
}

/// Row-buffer management policy handed to scheduling policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum PagePolicy {
    /// Close the row after each access (autoprecharge on the last burst).
    ClosePage,
    /// Leave the row open and precharge only on a row conflict.
    OpenPage,
}

/// Scheduling policy families understood by the factory.
///
/// Only the names live here; the policies themselves are registered with a
/// `PolicyRegistry` by the embedding simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum SchedulerKind {
    Fifo,
    #[serde(alias = "RWFifo")]
    RwFifo,
    BankQueueFifo,
    #[serde(alias = "BankRWQueueFifo")]
    BankRwQueueFifo,
    LookAhead,
}

/// Shape of the admission state published by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum QueueTopology {
    /// One admission value for the whole channel.
    Shared,
    /// One admission value per bank.
    PerBank,
}

/// Channel geometry and scheduler selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
    #[serde(default = "default_banks")]
    pub banks: u32,

    #[serde(default = "default_rows")]
    pub rows: u32,

    #[serde(default = "default_columns")]
    pub columns: u32,

    /// Words per burst.
    #[serde(default = "default_burst_length")]
    pub burst_length: u32,

    #[serde(default = "default_burst_bytes_per_cycle")]
    pub burst_bytes_per_cycle: u32,

    #[serde(default = "default_page_policy")]
    pub page_policy: PagePolicy,

    #[serde(default = "default_scheduler")]
    pub scheduler: SchedulerKind,

    #[serde(default = "default_queue_topology")]
    pub queue_topology: QueueTopology,

    #[serde(default = "default_max_transactions")]
    pub max_channel_transactions: u32,

    #[serde(default)]
    pub dedicated_read_transactions: u32,

    /// Free-form string forwarded to the scheduling policy.
    #[serde(default)]
    pub debug_string: String,

    /// Emit the per-cycle bank state line through the log facade.
    #[serde(default)]
    pub telemetry: bool,
}

/// Memory family and timing profile selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingConfig {
    #[serde(default = "default_memory_type")]
    pub memory_type: String,

    #[serde(default = "default_profile")]
    pub profile: String,

    /// Timing values used when `profile = "custom"`.
    #[serde(default)]
    pub custom: Option<TimingValues>,
}

/// Instance counts of the GPU units that may appear as requesters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientsConfig {
    #[serde(default = "default_streamer_loader_units")]
    pub streamer_loader_units: u32,

    #[serde(default = "default_texture_units")]
    pub texture_units: u32,

    /// ZStencilTest and ColorWrite units, one pair per stamp pipe.
    #[serde(default = "default_stamp_units")]
    pub stamp_units: u32,
}

impl Config {
    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks geometry, burst shape, transaction slots, and the timing profile.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ch = &self.channel;
        for (name, value) in [
            ("banks", ch.banks),
            ("rows", ch.rows),
            ("columns", ch.columns),
            ("burst_bytes_per_cycle", ch.burst_bytes_per_cycle),
            ("max_channel_transactions", ch.max_channel_transactions),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroParameter(name));
            }
        }

        if ch.burst_length == 0 || ch.burst_length > crate::dram::burst::MAX_BURST_WORDS as u32 {
            return Err(ConfigError::BurstLength(ch.burst_length));
        }

        let burst_bytes = ch.burst_length * 4;
        if burst_bytes % ch.burst_bytes_per_cycle != 0 {
            return Err(ConfigError::BurstBandwidth {
                bytes_per_cycle: ch.burst_bytes_per_cycle,
                burst_bytes,
            });
        }

        if ch.dedicated_read_transactions > ch.max_channel_transactions {
            return Err(ConfigError::DedicatedReads {
                dedicated: ch.dedicated_read_transactions,
                max: ch.max_channel_transactions,
            });
        }

        self.timing_params().map(|_| ())
    }

    /// Resolves the timing profile into the full parameter set.
    pub fn timing_params(&self) -> Result<TimingParams, ConfigError> {
        let values = timing::resolve_profile(
            &self.timing.memory_type,
            &self.timing.profile,
            self.timing.custom.as_ref(),
        )?;
        Ok(TimingParams::new(
            values,
            self.channel.burst_length,
            self.channel.burst_bytes_per_cycle,
        ))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            timing: TimingConfig::default(),
            clients: ClientsConfig::default(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            banks: DEFAULT_BANKS,
            rows: DEFAULT_ROWS,
            columns: DEFAULT_COLUMNS,
            burst_length: DEFAULT_BURST_LENGTH,
            burst_bytes_per_cycle: DEFAULT_BURST_BYTES_PER_CYCLE,
            page_policy: default_page_policy(),
            scheduler: default_scheduler(),
            queue_topology: default_queue_topology(),
            max_channel_transactions: DEFAULT_MAX_TRANSACTIONS,
            dedicated_read_transactions: 0,
            debug_string: String::new(),
            telemetry: false,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            memory_type: default_memory_type(),
            profile: default_profile(),
            custom: None,
        }
    }
}

impl Default for ClientsConfig {
    fn default() -> Self {
        Self {
            streamer_loader_units: DEFAULT_STREAMER_LOADER_UNITS,
            texture_units: DEFAULT_TEXTURE_UNITS,
            stamp_units: DEFAULT_STAMP_UNITS,
        }
    }
}

fn default_banks() -> u32 {
    DEFAULT_BANKS
}

fn default_rows() -> u32 {
    DEFAULT_ROWS
}

fn default_columns() -> u32 {
    DEFAULT_COLUMNS
}

fn default_burst_length() -> u32 {
    DEFAULT_BURST_LENGTH
}

fn default_burst_bytes_per_cycle() -> u32 {
    DEFAULT_BURST_BYTES_PER_CYCLE
}

fn default_page_policy() -> PagePolicy {
    PagePolicy::OpenPage
}

fn default_scheduler() -> SchedulerKind {
    SchedulerKind::Fifo
}

fn default_queue_topology() -> QueueTopology {
    QueueTopology::Shared
}

fn default_max_transactions() -> u32 {
    DEFAULT_MAX_TRANSACTIONS
}

fn default_memory_type() -> String {
    DEFAULT_MEMORY_TYPE.to_string()
}

fn default_profile() -> String {
    DEFAULT_PROFILE.to_string()
}

fn default_streamer_loader_units() -> u32 {
    DEFAULT_STREAMER_LOADER_UNITS
}

fn default_texture_units() -> u32 {
    DEFAULT_TEXTURE_UNITS
}

fn default_stamp_units() -> u32 {
    DEFAULT_STAMP_UNITS
}
