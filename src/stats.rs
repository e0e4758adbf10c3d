//! Statistics collection and reporting.
//!
//! Two collectors exist: `ModuleStats`, kept by the physical model and
//! describing how the data pins were used each cycle, and `ChannelStats`,
//! kept by the scheduler and describing the commands it issued and how often
//! they hit an open row.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::dram::constraint::ProtocolConstraint;
use crate::dram::pins::DataPinItem;

/// Data-pin utilisation of one DRAM module.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModuleStats {
    pub cycles: u64,

    pub data_cycles: u64,
    pub data_bytes: u64,
    pub read_data_cycles: u64,
    pub read_data_bytes: u64,
    pub write_data_cycles: u64,
    pub write_data_bytes: u64,

    pub idle_cycles: u64,
    pub cas_latency_cycles: u64,
    pub write_latency_cycles: u64,
    /// Idle data-pin cycles attributed to a protocol constraint.
    pub constraint_cycles: BTreeMap<ProtocolConstraint, u64>,

    pub all_banks_precharged_cycles: u64,

    pub active_commands: u64,
    pub read_commands: u64,
    pub write_commands: u64,
    pub precharge_commands: u64,
    pub dummy_commands: u64,
}

impl ModuleStats {
    /// Accounts one cycle of data-pin activity.
    pub fn record_pins(&mut self, item: DataPinItem, bytes_per_cycle: u64) {
        match item {
            DataPinItem::Read(_) => {
                self.data_cycles += 1;
                self.data_bytes += bytes_per_cycle;
                self.read_data_cycles += 1;
                self.read_data_bytes += bytes_per_cycle;
            }
            DataPinItem::Write(_) => {
                self.data_cycles += 1;
                self.data_bytes += bytes_per_cycle;
                self.write_data_cycles += 1;
                self.write_data_bytes += bytes_per_cycle;
            }
            DataPinItem::CasLatency => self.cas_latency_cycles += 1,
            DataPinItem::WriteLatency => self.write_latency_cycles += 1,
            DataPinItem::Constraint(ProtocolConstraint::None) | DataPinItem::Idle => {
                self.idle_cycles += 1
            }
            DataPinItem::Constraint(pc) => *self.constraint_cycles.entry(pc).or_insert(0) += 1,
        }
    }

    /// Fraction of cycles in which the pins carried data.
    pub fn utilisation(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.data_cycles as f64 / self.cycles as f64
        }
    }

    /// Prints a formatted summary of the data-pin statistics.
    pub fn print(&self) {
        println!("\n==========================================================");
        println!("DDR MODULE STATISTICS");
        println!("==========================================================");
        println!("cycles                       {}", self.cycles);
        println!(
            "data_cycles                  {} ({:.2}%)",
            self.data_cycles,
            self.utilisation() * 100.0
        );
        println!("data_bytes                   {}", self.data_bytes);
        println!("read_data_cycles             {}", self.read_data_cycles);
        println!("read_data_bytes              {}", self.read_data_bytes);
        println!("write_data_cycles            {}", self.write_data_cycles);
        println!("write_data_bytes             {}", self.write_data_bytes);
        println!("----------------------------------------------------------");
        println!("idle_cycles                  {}", self.idle_cycles);
        println!("wasted_cas_latency           {}", self.cas_latency_cycles);
        println!("wasted_write_latency         {}", self.write_latency_cycles);
        for pc in ProtocolConstraint::ALL.iter().skip(1) {
            if let Some(count) = self.constraint_cycles.get(pc) {
                println!("{:<28} {}", format!("wasted_{}", pc.as_str().to_lowercase()), count);
            }
        }
        println!("all_banks_precharged         {}", self.all_banks_precharged_cycles);
        println!("----------------------------------------------------------");
        println!("act_commands                 {}", self.active_commands);
        println!("read_commands                {}", self.read_commands);
        println!("write_commands               {}", self.write_commands);
        println!("precharge_commands           {}", self.precharge_commands);
        println!("dummy_commands               {}", self.dummy_commands);
        println!("==========================================================");
    }
}

/// Row-buffer hit and miss counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RowHitCounter {
    pub hits: u64,
    pub misses: u64,
}

impl RowHitCounter {
    pub fn record(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    pub fn total(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.hits as f64 / self.total() as f64
        }
    }
}

/// Command and row-locality statistics of one channel scheduler.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChannelStats {
    pub cycles: u64,
    pub requests_received: u64,
    pub replies_sent: u64,

    pub read_bytes: u64,
    pub write_bytes: u64,

    pub active_commands: u64,
    pub read_commands: u64,
    pub write_commands: u64,
    pub precharge_commands: u64,
    pub dummy_commands: u64,

    pub row_hits: RowHitCounter,
    pub read_row_hits: RowHitCounter,
    pub write_row_hits: RowHitCounter,
    /// Row hits keyed by requester, e.g. `TextureUnit[2]`.
    pub client_row_hits: BTreeMap<String, RowHitCounter>,
}

impl ChannelStats {
    /// Prints a formatted summary of the scheduler statistics.
    pub fn print(&self) {
        print!("{}", self);
    }

    fn write_counter(f: &mut fmt::Formatter<'_>, label: &str, counter: &RowHitCounter) -> fmt::Result {
        writeln!(
            f,
            "{:<28} {} hits / {} misses ({:.2}%)",
            label,
            counter.hits,
            counter.misses,
            counter.hit_rate() * 100.0
        )
    }
}

impl fmt::Display for ChannelStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n==========================================================")?;
        writeln!(f, "CHANNEL SCHEDULER STATISTICS")?;
        writeln!(f, "==========================================================")?;
        writeln!(f, "cycles                       {}", self.cycles)?;
        writeln!(f, "requests_received            {}", self.requests_received)?;
        writeln!(f, "replies_sent                 {}", self.replies_sent)?;
        writeln!(f, "read_bytes                   {}", self.read_bytes)?;
        writeln!(f, "write_bytes                  {}", self.write_bytes)?;
        writeln!(f, "----------------------------------------------------------")?;
        writeln!(f, "act_commands                 {}", self.active_commands)?;
        writeln!(f, "read_commands                {}", self.read_commands)?;
        writeln!(f, "write_commands               {}", self.write_commands)?;
        writeln!(f, "precharge_commands           {}", self.precharge_commands)?;
        writeln!(f, "dummy_commands               {}", self.dummy_commands)?;
        writeln!(f, "----------------------------------------------------------")?;
        Self::write_counter(f, "row", &self.row_hits)?;
        Self::write_counter(f, "read_row", &self.read_row_hits)?;
        Self::write_counter(f, "write_row", &self.write_row_hits)?;
        for (client, counter) in &self.client_row_hits {
            Self::write_counter(f, client, counter)?;
        }
        writeln!(f, "==========================================================")
    }
}
