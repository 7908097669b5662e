//! Samples and snapshots handed from the samplers to consumers.
//! Everything published here is immutable once built; consumers get `Arc<Snapshot>`.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One independently sampled group of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Cpu,
    Memory,
    Disk,
    Network,
    Processes,
}

impl Family {
    pub const ALL: [Family; 5] = [
        Family::Cpu,
        Family::Memory,
        Family::Disk,
        Family::Network,
        Family::Processes,
    ];

    /// Slot index inside the snapshot store.
    pub(crate) fn index(self) -> usize {
        match self {
            Family::Cpu => 0,
            Family::Memory => 1,
            Family::Disk => 2,
            Family::Network => 3,
            Family::Processes => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Family::Cpu => "cpu",
            Family::Memory => "memory",
            Family::Disk => "disk",
            Family::Network => "network",
            Family::Processes => "processes",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Family::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown metric family '{s}'"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CpuSample {
    pub percent: f32,
    pub per_core: Vec<f32>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemorySample {
    pub percent: f32,
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiskSample {
    pub mount_point: String,
    pub percent: f32,
    pub used_bytes: u64,
    pub total_bytes: u64,
}

/// Raw cumulative interface counters. Kept by the network sampler as "previous";
/// never published, so the timestamp can stay monotonic.
#[derive(Debug, Clone, Copy)]
pub struct NetworkCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub timestamp: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NetworkRate {
    pub sent_bytes_per_sec: f64,
    pub recv_bytes_per_sec: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkSample {
    /// `None` while initializing: first tick, or the tick right after a counter reset.
    pub rate: Option<NetworkRate>,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: Option<String>,
    pub cpu_percent: Option<f32>,
    pub mem_percent: Option<f32>,
}

impl ProcessInfo {
    pub fn cpu(&self) -> f32 {
        self.cpu_percent.unwrap_or(0.0)
    }

    pub fn mem(&self) -> f32 {
        self.mem_percent.unwrap_or(0.0)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("N/A")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessSample {
    /// Processes enumerated before ranking.
    pub total: usize,
    pub top: Vec<ProcessInfo>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum Payload {
    Cpu(CpuSample),
    Memory(MemorySample),
    Disk(DiskSample),
    Network(NetworkSample),
    Processes(ProcessSample),
}

impl Payload {
    pub fn family(&self) -> Family {
        match self {
            Payload::Cpu(_) => Family::Cpu,
            Payload::Memory(_) => Family::Memory,
            Payload::Disk(_) => Family::Disk,
            Payload::Network(_) => Family::Network,
            Payload::Processes(_) => Family::Processes,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reading {
    Ready(Payload),
    /// Family-scoped failure; rendered as "unavailable: <reason>".
    Unavailable(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub family: Family,
    pub version: u64,
    pub taken_at: DateTime<Utc>,
    pub reading: Reading,
}

impl Snapshot {
    pub fn new(family: Family, version: u64, reading: Reading) -> Self {
        Self {
            family,
            version,
            taken_at: Utc::now(),
            reading,
        }
    }

    pub fn payload(&self) -> Option<&Payload> {
        match &self.reading {
            Reading::Ready(p) => Some(p),
            Reading::Unavailable(_) => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.reading {
            Reading::Unavailable(reason) => Some(reason),
            Reading::Ready(_) => None,
        }
    }

    pub fn cpu(&self) -> Option<&CpuSample> {
        match self.payload()? {
            Payload::Cpu(s) => Some(s),
            _ => None,
        }
    }

    pub fn memory(&self) -> Option<&MemorySample> {
        match self.payload()? {
            Payload::Memory(s) => Some(s),
            _ => None,
        }
    }

    pub fn disk(&self) -> Option<&DiskSample> {
        match self.payload()? {
            Payload::Disk(s) => Some(s),
            _ => None,
        }
    }

    pub fn network(&self) -> Option<&NetworkSample> {
        match self.payload()? {
            Payload::Network(s) => Some(s),
            _ => None,
        }
    }

    pub fn processes(&self) -> Option<&ProcessSample> {
        match self.payload()? {
            Payload::Processes(s) => Some(s),
            _ => None,
        }
    }
}

/// Clamp to the 0..=100 percent range; NaN becomes 0.
pub(crate) fn clamp_percent(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 100.0)
    }
}

/// `used / total` as a percent, 0 when `total` is 0.
pub(crate) fn ratio_percent(used: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    clamp_percent((used as f64 / total as f64 * 100.0) as f32)
}
