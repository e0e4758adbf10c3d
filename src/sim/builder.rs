//! Channel Builder.
//!
//! Constructs the physical module and the channel scheduler from a validated
//! configuration. Scheduling policies are not part of this crate; the
//! embedding simulator registers a constructor for each `SchedulerKind` it
//! supports, and selecting an unregistered kind is a configuration error.

use std::collections::HashMap;

use crate::common::ConfigError;
use crate::config::{ChannelConfig, Config, SchedulerKind};
use crate::dram::module::DdrModule;
use crate::scheduler::channel::{ChannelScheduler, SchedulingPolicy};
use crate::sim::channel::MemoryChannel;

/// Builds a boxed policy for one channel.
pub type PolicyConstructor = fn(&ChannelConfig) -> Box<dyn SchedulingPolicy>;

/// Maps scheduler kinds to policy constructors.
#[derive(Default)]
pub struct PolicyRegistry {
    constructors: HashMap<SchedulerKind, PolicyConstructor>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the constructor for `kind`.
    pub fn register(&mut self, kind: SchedulerKind, constructor: PolicyConstructor) -> &mut Self {
        self.constructors.insert(kind, constructor);
        self
    }

    pub fn contains(&self, kind: SchedulerKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    /// Instantiates the policy registered for `kind`.
    pub fn create(
        &self,
        kind: SchedulerKind,
        config: &ChannelConfig,
    ) -> Result<Box<dyn SchedulingPolicy>, ConfigError> {
        self.constructors
            .get(&kind)
            .map(|constructor| constructor(config))
            .ok_or(ConfigError::UnsupportedScheduler(kind))
    }
}

/// Builds the physical module described by `config`.
///
/// # Arguments
///
/// * `name` - Name used in diagnostics and telemetry.
/// * `config` - The configuration; it is validated here.
///
/// # Returns
///
/// The module, or the configuration error that prevents building it.
pub fn build_module(name: &str, config: &Config) -> Result<DdrModule, ConfigError> {
    config.validate()?;
    let params = config.timing_params()?;
    let ch = &config.channel;
    let mut module = DdrModule::new(name, ch.banks, ch.rows, ch.columns, params);
    module.set_telemetry(ch.telemetry);
    log::info!(
        "{}: {} banks of {}x{} words, profile {} ({})",
        name,
        ch.banks,
        ch.rows,
        ch.columns,
        config.timing.profile,
        config.timing.memory_type
    );
    Ok(module)
}

/// Builds the channel scheduler selected by `config.channel.scheduler`.
pub fn build_scheduler(
    name: &str,
    config: &Config,
    registry: &PolicyRegistry,
) -> Result<ChannelScheduler<Box<dyn SchedulingPolicy>>, ConfigError> {
    config.validate()?;
    let params = config.timing_params()?;
    let policy = registry.create(config.channel.scheduler, &config.channel)?;
    log::info!(
        "{}: {:?} scheduler, {:?}, {:?} queues",
        name,
        config.channel.scheduler,
        config.channel.page_policy,
        config.channel.queue_topology
    );
    Ok(ChannelScheduler::new(name, config, params, policy))
}

/// Builds a scheduler and a module wired together as one channel.
pub fn build_channel(
    name: &str,
    config: &Config,
    registry: &PolicyRegistry,
) -> Result<MemoryChannel<Box<dyn SchedulingPolicy>>, ConfigError> {
    let scheduler = build_scheduler(&format!("{}.scheduler", name), config, registry)?;
    let module = build_module(&format!("{}.ddr", name), config)?;
    Ok(MemoryChannel::new(scheduler, module))
}
