//! Sampler configuration: per-family cadences, disk path, top-N, CPU window.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::SamplerError;
use crate::ranker::DEFAULT_TOP_N;
use crate::types::Family;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cadences {
    pub cpu: Duration,
    pub memory: Duration,
    pub disk: Duration,
    pub network: Duration,
    pub processes: Duration,
}

impl Default for Cadences {
    fn default() -> Self {
        Self {
            cpu: Duration::from_secs(1),
            memory: Duration::from_secs(1),
            disk: Duration::from_secs(2),
            network: Duration::from_secs(1),
            processes: Duration::from_secs(2),
        }
    }
}

impl Cadences {
    pub fn get(&self, family: Family) -> Duration {
        match family {
            Family::Cpu => self.cpu,
            Family::Memory => self.memory,
            Family::Disk => self.disk,
            Family::Network => self.network,
            Family::Processes => self.processes,
        }
    }

    pub fn set(&mut self, family: Family, period: Duration) {
        let slot = match family {
            Family::Cpu => &mut self.cpu,
            Family::Memory => &mut self.memory,
            Family::Disk => &mut self.disk,
            Family::Network => &mut self.network,
            Family::Processes => &mut self.processes,
        };
        *slot = period;
    }
}

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub cadences: Cadences,
    /// Any path on the filesystem to watch; resolved to its mount point.
    pub disk_path: PathBuf,
    pub top_n: usize,
    /// Gap between the two CPU usage refreshes of one CPU read.
    pub cpu_window: Duration,
    /// How long `stop()` waits for family tasks before giving up.
    pub shutdown_grace: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            cadences: Cadences::default(),
            disk_path: PathBuf::from("/"),
            top_n: DEFAULT_TOP_N,
            cpu_window: Duration::from_millis(200),
            shutdown_grace: Duration::from_secs(2),
        }
    }
}

impl SamplerConfig {
    pub fn with_cadence(mut self, family: Family, period: Duration) -> Self {
        self.cadences.set(family, period);
        self
    }

    pub fn with_disk_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.disk_path = path.into();
        self
    }

    pub fn with_top_n(mut self, n: usize) -> Self {
        self.top_n = n;
        self
    }

    pub fn validate(&self) -> Result<(), SamplerError> {
        for family in Family::ALL {
            if self.cadences.get(family).is_zero() {
                return Err(SamplerError::InvalidConfig(format!(
                    "{family} cadence must be non-zero"
                )));
            }
        }
        if self.top_n == 0 {
            return Err(SamplerError::InvalidConfig(
                "top_n must be at least 1".into(),
            ));
        }
        if self.disk_path.as_os_str().is_empty() {
            return Err(SamplerError::InvalidConfig("disk path is empty".into()));
        }
        Ok(())
    }
}
