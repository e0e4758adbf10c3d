//! Command-Trace Replay.
//!
//! A trace is a TOML list of DDR commands stamped with the cycle they are
//! issued in:
//!
//! ```toml
//! [[command]]
//! cycle = 0
//! op = "active"
//! bank = 0
//! row = 5
//!
//! [[command]]
//! cycle = 12
//! op = "read"
//! bank = 0
//! column = 0
//! autoprecharge = true
//! ```
//!
//! `TraceRunner` replays a trace cycle by cycle. Every command is first checked
//! against the predictive model; a command the timing rules refuse is reported
//! as a `TraceError` instead of reaching the physical module, so malformed
//! traces never abort the process.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::common::{BankId, ConfigError, Cycle};
use crate::config::Config;
use crate::dram::burst::Burst;
use crate::dram::command::{Command, CommandOp};
use crate::dram::constraint::{Constraint, ProtocolConstraint};
use crate::dram::module::DdrModule;
use crate::dram::state::ModuleState;
use crate::sim::builder::build_module;
use crate::stats::ModuleStats;

/// Errors raised while loading or replaying a trace.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to read trace: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse trace: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("command at cycle {cycle} does not follow cycle {previous}")]
    OutOfOrder { cycle: Cycle, previous: Cycle },

    #[error("cycle {cycle}: bank {bank} out of range ({banks} banks)")]
    BankOutOfRange { cycle: Cycle, bank: u32, banks: u32 },

    #[error("cycle {cycle}: row {row} out of range ({rows} rows)")]
    RowOutOfRange { cycle: Cycle, row: u32, rows: u32 },

    #[error("cycle {cycle}: burst at column {column} overflows the {columns}-column row")]
    ColumnOutOfRange { cycle: Cycle, column: u32, columns: u32 },

    #[error("cycle {cycle}: write carries {words} words but bursts hold {burst_length}")]
    BurstTooLong {
        cycle: Cycle,
        words: usize,
        burst_length: u32,
    },

    #[error("cycle {cycle}: precharge of all banks is not supported")]
    PrechargeAll { cycle: Cycle },

    #[error("cycle {cycle}: {command} rejected by timing rule {constraint}")]
    Rejected {
        cycle: Cycle,
        command: String,
        constraint: Constraint,
    },
}

/// One command of a trace.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TraceEntry {
    pub cycle: Cycle,
    #[serde(flatten)]
    pub op: TraceOp,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum TraceOp {
    Active {
        bank: u32,
        row: u32,
    },
    Read {
        bank: u32,
        column: u32,
        #[serde(default)]
        autoprecharge: bool,
    },
    /// Words beyond the end of `data` are masked out; an empty list writes zeros.
    Write {
        bank: u32,
        column: u32,
        #[serde(default)]
        data: Vec<u32>,
        #[serde(default)]
        autoprecharge: bool,
    },
    /// Without a bank the precharge addresses every bank.
    Precharge {
        #[serde(default)]
        bank: Option<u32>,
    },
    Dummy {
        #[serde(default)]
        constraint: ProtocolConstraint,
    },
}

/// A list of commands ordered by strictly increasing cycle.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Trace {
    #[serde(default, rename = "command")]
    pub commands: Vec<TraceEntry>,
}

impl Trace {
    pub fn from_toml_str(text: &str) -> Result<Self, TraceError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TraceError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

/// A read burst returned by the module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceReply {
    pub cycle: Cycle,
    pub words: Vec<u32>,
}

/// Outcome of a successful replay.
#[derive(Debug, Clone, Serialize)]
pub struct TraceReport {
    /// Cycles simulated, including the drain after the last command.
    pub cycles: Cycle,
    pub commands: usize,
    pub replies: Vec<TraceReply>,
    pub retired_writes: u64,
    pub stats: ModuleStats,
}

/// Replays traces against a predictive model and a physical module in lock-step.
pub struct TraceRunner {
    config: Config,
    state: ModuleState,
    module: DdrModule,
    /// First cycle of the next replay; successive traces continue in time.
    cycle: Cycle,
}

impl TraceRunner {
    /// Builds the models described by `config`.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let module = build_module("ddr", config)?;
        let state = ModuleState::new(config.channel.banks, *module.params());
        Ok(Self {
            config: config.clone(),
            state,
            module,
            cycle: 0,
        })
    }

    pub fn module(&self) -> &DdrModule {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut DdrModule {
        &mut self.module
    }

    /// Replays `trace` and runs until every pending reply has been delivered.
    ///
    /// # Returns
    ///
    /// The replies and statistics of the run, or the first error found. On
    /// error the models keep the state reached before the offending command.
    pub fn run(&mut self, trace: &Trace) -> Result<TraceReport, TraceError> {
        let mut replies = Vec::new();
        let mut retired_writes = 0;
        let mut previous: Option<Cycle> = None;
        let mut next = 0;
        let start = self.cycle;
        let mut cycle = start;

        loop {
            self.state.advance_cycle(cycle);

            let command = match trace.commands.get(next) {
                Some(entry) if entry.cycle < cycle => {
                    return Err(TraceError::OutOfOrder {
                        cycle: entry.cycle,
                        previous: previous.unwrap_or(0),
                    });
                }
                Some(entry) if entry.cycle == cycle => {
                    let command = self.build_command(cycle, &entry.op)?;
                    self.check_and_post(cycle, &command)?;
                    previous = Some(cycle);
                    next += 1;
                    Some(command)
                }
                _ => None,
            };

            let out = self.module.clock(cycle, command);
            if let Some(burst) = out.reply {
                replies.push(TraceReply {
                    cycle,
                    words: burst.words().to_vec(),
                });
            }
            if out.retired_write.is_some() {
                retired_writes += 1;
            }

            cycle += 1;
            self.cycle = cycle;
            if next == trace.commands.len() && self.module.is_quiescent() {
                break;
            }
        }

        log::info!(
            "trace replay finished after {} cycles ({} commands, {} replies)",
            cycle - start,
            trace.commands.len(),
            replies.len()
        );

        Ok(TraceReport {
            cycles: cycle - start,
            commands: trace.commands.len(),
            replies,
            retired_writes,
            stats: self.module.stats().clone(),
        })
    }

    fn build_command(&self, cycle: Cycle, op: &TraceOp) -> Result<Command, TraceError> {
        let ch = &self.config.channel;
        let command = match op {
            TraceOp::Active { bank, row } => {
                let bank = self.bank(cycle, *bank)?;
                if *row >= ch.rows {
                    return Err(TraceError::RowOutOfRange {
                        cycle,
                        row: *row,
                        rows: ch.rows,
                    });
                }
                Command::active(bank, *row)
            }
            TraceOp::Read {
                bank,
                column,
                autoprecharge,
            } => {
                let bank = self.bank(cycle, *bank)?;
                self.check_column(cycle, *column)?;
                Command::read(bank, *column, *autoprecharge)
            }
            TraceOp::Write {
                bank,
                column,
                data,
                autoprecharge,
            } => {
                let bank = self.bank(cycle, *bank)?;
                self.check_column(cycle, *column)?;
                if data.len() > ch.burst_length as usize {
                    return Err(TraceError::BurstTooLong {
                        cycle,
                        words: data.len(),
                        burst_length: ch.burst_length,
                    });
                }
                let mut burst = Burst::new(ch.burst_length as usize);
                if !data.is_empty() {
                    for i in 0..burst.len() {
                        match data.get(i) {
                            Some(&word) => burst.set_word(i, word),
                            None => burst.set_mask(i, 0),
                        }
                    }
                }
                Command::write(bank, *column, burst, *autoprecharge)
            }
            TraceOp::Precharge { bank: Some(bank) } => Command::precharge(self.bank(cycle, *bank)?),
            TraceOp::Precharge { bank: None } => return Err(TraceError::PrechargeAll { cycle }),
            TraceOp::Dummy { constraint } => Command::dummy(*constraint),
        };
        Ok(command)
    }

    fn check_and_post(&mut self, cycle: Cycle, command: &Command) -> Result<(), TraceError> {
        let bank = match command.bank() {
            Some(bank) => bank,
            None => return Ok(()),
        };
        let constraint = self.state.constraint_for(bank, command.kind());
        if !constraint.is_none() {
            return Err(TraceError::Rejected {
                cycle,
                command: command.to_string(),
                constraint,
            });
        }
        match command.op() {
            CommandOp::Active { row, .. } => self.state.post_active(bank, *row),
            CommandOp::Read { autoprecharge, .. } => self.state.post_read(bank, *autoprecharge),
            CommandOp::Write { autoprecharge, .. } => self.state.post_write(bank, *autoprecharge),
            CommandOp::Precharge { .. } => self.state.post_precharge(bank),
            CommandOp::Dummy => {}
        }
        Ok(())
    }

    fn bank(&self, cycle: Cycle, bank: u32) -> Result<BankId, TraceError> {
        let banks = self.config.channel.banks;
        if bank >= banks {
            return Err(TraceError::BankOutOfRange { cycle, bank, banks });
        }
        Ok(BankId::new(bank))
    }

    fn check_column(&self, cycle: Cycle, column: u32) -> Result<(), TraceError> {
        let ch = &self.config.channel;
        if column as u64 + ch.burst_length as u64 > ch.columns as u64 {
            return Err(TraceError::ColumnOutOfRange {
                cycle,
                column,
                columns: ch.columns,
            });
        }
        Ok(())
    }
}
