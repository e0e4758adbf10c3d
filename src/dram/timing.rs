//! Timing Parameters.
//!
//! All latencies are expressed in memory-clock cycles. The only modelled
//! family is GDDR3; its named profiles live in a small table so that another
//! family can be added as data rather than code.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::common::ConfigError;

/// The eight protocol latencies of a DRAM device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimingValues {
    /// ACTIVE to ACTIVE on different banks.
    pub t_rrd: u64,
    /// ACTIVE to READ/WRITE on the same bank.
    pub t_rcd: u64,
    /// End of write data to READ.
    pub t_wtr: u64,
    /// Bus turnaround from read data to write data.
    pub t_rtw: u64,
    /// Write recovery: end of write data to PRECHARGE.
    pub t_wr: u64,
    /// PRECHARGE duration.
    pub t_rp: u64,
    /// READ to first data word.
    pub cas_latency: u64,
    /// WRITE to first data word.
    pub write_latency: u64,
}

/// GDDR3 at 600 MHz.
pub const GDDR3_600: TimingValues = TimingValues {
    t_rrd: 8,
    t_rcd: 12,
    t_wtr: 5,
    t_rtw: 2,
    t_wr: 10,
    t_rp: 12,
    cas_latency: 9,
    write_latency: 4,
};

/// Zero-latency memory, for isolating scheduler behaviour from DRAM timing.
pub const PERFECT: TimingValues = TimingValues {
    t_rrd: 0,
    t_rcd: 0,
    t_wtr: 0,
    t_rtw: 0,
    t_wr: 0,
    t_rp: 0,
    cas_latency: 0,
    write_latency: 0,
};

const GDDR3_PROFILES: &[(&str, TimingValues)] = &[("600", GDDR3_600), ("perfect", PERFECT)];

/// Selects the timing values for a memory family and profile name.
///
/// # Arguments
///
/// * `memory_type` - The memory family; only `gddr3` is accepted.
/// * `profile` - A profile name from the table, or `custom`.
/// * `custom` - The values used when `profile` is `custom`.
///
/// # Returns
///
/// The resolved values, or the configuration error describing why the
/// selection is invalid.
pub fn resolve_profile(
    memory_type: &str,
    profile: &str,
    custom: Option<&TimingValues>,
) -> Result<TimingValues, ConfigError> {
    if !memory_type.eq_ignore_ascii_case("gddr3") {
        return Err(ConfigError::UnsupportedMemoryType(memory_type.to_string()));
    }

    if profile == "custom" {
        return custom.copied().ok_or(ConfigError::MissingCustomTiming);
    }

    GDDR3_PROFILES
        .iter()
        .find(|(name, _)| *name == profile)
        .map(|(_, values)| *values)
        .ok_or_else(|| ConfigError::UnknownProfile(profile.to_string()))
}

/// Complete parameter set consumed by the timing rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimingParams {
    pub t_rrd: u64,
    pub t_rcd: u64,
    pub t_wtr: u64,
    pub t_rtw: u64,
    pub t_wr: u64,
    pub t_rp: u64,
    pub cas_latency: u64,
    pub write_latency: u64,
    /// Words per burst.
    pub burst_length: u32,
    /// Bytes moved across the data pins per cycle.
    pub burst_bytes_per_cycle: u32,
}

impl TimingParams {
    /// Combines latency values with the burst shape.
    pub fn new(values: TimingValues, burst_length: u32, burst_bytes_per_cycle: u32) -> Self {
        Self {
            t_rrd: values.t_rrd,
            t_rcd: values.t_rcd,
            t_wtr: values.t_wtr,
            t_rtw: values.t_rtw,
            t_wr: values.t_wr,
            t_rp: values.t_rp,
            cas_latency: values.cas_latency,
            write_latency: values.write_latency,
            burst_length,
            burst_bytes_per_cycle,
        }
    }

    /// Cycles the data pins are occupied by one burst.
    pub fn burst_transmission_time(&self) -> u64 {
        u64::from(4 * self.burst_length / self.burst_bytes_per_cycle)
    }

    /// Bytes carried by one burst.
    pub fn burst_bytes(&self) -> u32 {
        4 * self.burst_length
    }
}

impl fmt::Display for TimingParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  tRRD:               {}", self.t_rrd)?;
        writeln!(f, "  tRCD:               {}", self.t_rcd)?;
        writeln!(f, "  tWTR:               {}", self.t_wtr)?;
        writeln!(f, "  tRTW:               {}", self.t_rtw)?;
        writeln!(f, "  tWR:                {}", self.t_wr)?;
        writeln!(f, "  tRP:                {}", self.t_rp)?;
        writeln!(f, "  CAS Latency:        {}", self.cas_latency)?;
        writeln!(f, "  Write Latency:      {}", self.write_latency)?;
        writeln!(f, "  Burst Length:       {} words", self.burst_length)?;
        writeln!(f, "  Bytes per Cycle:    {}", self.burst_bytes_per_cycle)?;
        write!(
            f,
            "  Burst Transmission: {} cycles",
            self.burst_transmission_time()
        )
    }
}
