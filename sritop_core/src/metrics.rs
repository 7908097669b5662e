//! Metric source adapter: point-in-time OS readings via sysinfo.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::Utc;
use sysinfo::{
    CpuRefreshKind, Disks, MemoryRefreshKind, Networks, ProcessRefreshKind, ProcessesToUpdate,
    RefreshKind, System, MINIMUM_CPU_UPDATE_INTERVAL,
};
use tracing::{debug, warn};

use crate::error::SampleError;
use crate::types::{
    clamp_percent, ratio_percent, CpuSample, DiskSample, Family, MemorySample, NetworkCounters,
    ProcessInfo,
};

/// Read-only access to host metrics. Calls may block (the CPU read sleeps for
/// its window); the sampler runs them on blocking workers.
pub trait MetricSource: Send + Sync + 'static {
    fn read_cpu(&self) -> Result<CpuSample, SampleError>;
    fn read_memory(&self) -> Result<MemorySample, SampleError>;
    fn read_disk(&self, path: &Path) -> Result<DiskSample, SampleError>;
    fn read_network_counters(&self) -> Result<NetworkCounters, SampleError>;
    fn list_processes(&self) -> Result<Vec<ProcessInfo>, SampleError>;
}

/// sysinfo-backed source. One handle per family so a long CPU read never holds
/// the lock the process or network sampler needs.
pub struct SysinfoSource {
    cpu: Mutex<System>,
    memory: Mutex<System>,
    networks: Mutex<Networks>,
    procs: Mutex<System>,
    cpu_window: Duration,
    cores: usize,
}

impl SysinfoSource {
    pub fn new(cpu_window: Duration) -> Self {
        let cpu = System::new_with_specifics(
            RefreshKind::nothing().with_cpu(CpuRefreshKind::nothing().with_cpu_usage()),
        );
        let memory = System::new_with_specifics(
            RefreshKind::nothing().with_memory(MemoryRefreshKind::nothing().with_ram()),
        );
        let procs = System::new_with_specifics(
            RefreshKind::nothing().with_memory(MemoryRefreshKind::nothing().with_ram()),
        );
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            cpu: Mutex::new(cpu),
            memory: Mutex::new(memory),
            networks: Mutex::new(Networks::new_with_refreshed_list()),
            procs: Mutex::new(procs),
            cpu_window: cpu_window.max(MINIMUM_CPU_UPDATE_INTERVAL),
            cores,
        }
    }

    pub fn host_name() -> String {
        System::host_name().unwrap_or_else(|| "unknown".into())
    }
}

// The handle only caches counters the next refresh overwrites; take it back after a panic.
fn lock<T>(m: &Mutex<T>, family: Family) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| {
        warn!(%family, "sysinfo handle poisoned by an earlier panic; reusing it");
        m.clear_poison();
        poisoned.into_inner()
    })
}

impl MetricSource for SysinfoSource {
    fn read_cpu(&self) -> Result<CpuSample, SampleError> {
        let mut sys = lock(&self.cpu, Family::Cpu);
        // usage is a delta between two refreshes; the window is the measurement
        sys.refresh_cpu_usage();
        std::thread::sleep(self.cpu_window);
        sys.refresh_cpu_usage();

        Ok(CpuSample {
            percent: clamp_percent(sys.global_cpu_usage()),
            per_core: sys
                .cpus()
                .iter()
                .map(|c| clamp_percent(c.cpu_usage()))
                .collect(),
            timestamp: Utc::now(),
        })
    }

    fn read_memory(&self) -> Result<MemorySample, SampleError> {
        let mut sys = lock(&self.memory, Family::Memory);
        sys.refresh_memory();
        let total = sys.total_memory();
        if total == 0 {
            return Err(SampleError::Unavailable("memory totals not reported".into()));
        }
        let used = total.saturating_sub(sys.available_memory()).min(total);
        Ok(MemorySample {
            percent: ratio_percent(used, total),
            used_bytes: used,
            total_bytes: total,
            timestamp: Utc::now(),
        })
    }

    fn read_disk(&self, path: &Path) -> Result<DiskSample, SampleError> {
        let target = path
            .canonicalize()
            .map_err(|source| SampleError::PathUnreachable {
                path: path.to_path_buf(),
                source,
            })?;

        let disks = Disks::new_with_refreshed_list();
        let mounts: Vec<(PathBuf, u64, u64)> = disks
            .list()
            .iter()
            .map(|d| {
                (
                    d.mount_point().to_path_buf(),
                    d.total_space(),
                    d.available_space(),
                )
            })
            .collect();

        let (mount, total, available) =
            containing_mount(&target, &mounts).ok_or(SampleError::NotMounted(target.clone()))?;
        let used = total.saturating_sub(available);
        Ok(DiskSample {
            mount_point: mount.display().to_string(),
            percent: ratio_percent(used, total),
            used_bytes: used,
            total_bytes: total,
        })
    }

    fn read_network_counters(&self) -> Result<NetworkCounters, SampleError> {
        let mut nets = lock(&self.networks, Family::Network);
        // drop vanished interfaces: the summed counters then go down and the
        // rate calculator treats that interval as a reset
        nets.refresh(true);
        let (mut sent, mut recv) = (0u64, 0u64);
        for (_, data) in nets.iter() {
            sent = sent.saturating_add(data.total_transmitted());
            recv = recv.saturating_add(data.total_received());
        }
        Ok(NetworkCounters {
            bytes_sent: sent,
            bytes_recv: recv,
            timestamp: Instant::now(),
        })
    }

    fn list_processes(&self) -> Result<Vec<ProcessInfo>, SampleError> {
        let mut sys = lock(&self.procs, Family::Processes);
        sys.refresh_memory();
        // remove_dead = true: processes that exited since the last tick are dropped
        // instead of reported with stale values. Linux tasks (threads) are not
        // enumerated; each would otherwise show up as its own pid.
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing()
                .with_cpu()
                .with_memory()
                .without_tasks(),
        );

        let total_mem = sys.total_memory();
        let cores = self.cores.max(1) as f32;
        let list: Vec<ProcessInfo> = sys
            .processes()
            .values()
            .filter(|p| p.thread_kind().is_none())
            .map(|p| {
                let name = p.name().to_string_lossy();
                ProcessInfo {
                    pid: p.pid().as_u32(),
                    name: (!name.is_empty()).then(|| name.into_owned()),
                    cpu_percent: Some(clamp_percent(p.cpu_usage() / cores)),
                    mem_percent: (total_mem > 0).then(|| ratio_percent(p.memory(), total_mem)),
                }
            })
            .collect();

        if list.is_empty() {
            return Err(SampleError::Unavailable(
                "process table could not be enumerated".into(),
            ));
        }
        debug!(count = list.len(), "enumerated processes");
        Ok(list)
    }
}

/// Mounted filesystem with the longest mount point that is a prefix of `target`.
fn containing_mount<'a>(
    target: &Path,
    mounts: &'a [(PathBuf, u64, u64)],
) -> Option<(&'a PathBuf, u64, u64)> {
    mounts
        .iter()
        .filter(|(mp, _, _)| target.starts_with(mp))
        .max_by_key(|(mp, _, _)| mp.components().count())
        .map(|(mp, total, avail)| (mp, *total, *avail))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mounts() -> Vec<(PathBuf, u64, u64)> {
        vec![
            (PathBuf::from("/"), 100, 40),
            (PathBuf::from("/home"), 500, 100),
            (PathBuf::from("/home/shared"), 50, 5),
        ]
    }

    #[test]
    fn picks_deepest_containing_mount() {
        let m = mounts();
        let (mp, total, _) = containing_mount(Path::new("/home/alice/docs"), &m).unwrap();
        assert_eq!(mp, &PathBuf::from("/home"));
        assert_eq!(total, 500);

        let (mp, _, _) = containing_mount(Path::new("/home/shared/x"), &m).unwrap();
        assert_eq!(mp, &PathBuf::from("/home/shared"));

        let (mp, _, _) = containing_mount(Path::new("/var/log"), &m).unwrap();
        assert_eq!(mp, &PathBuf::from("/"));
    }

    #[test]
    fn prefix_match_is_per_component() {
        let m = vec![(PathBuf::from("/data"), 10, 1)];
        // "/database" must not match the "/data" mount
        assert!(containing_mount(Path::new("/database"), &m).is_none());
        assert!(containing_mount(Path::new("/data/x"), &m).is_some());
    }

    #[test]
    fn no_mounts_means_not_mounted() {
        assert!(containing_mount(Path::new("/"), &[]).is_none());
    }

    #[test]
    fn poisoned_handle_is_taken_back() {
        let m = Mutex::new(7u32);
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut g = m.lock().unwrap();
            *g = 8;
            panic!("read blew up mid-refresh");
        }));
        assert!(m.is_poisoned());

        assert_eq!(*lock(&m, Family::Memory), 8);
        assert!(!m.is_poisoned());
    }

    #[test]
    fn memory_reads_recover_after_a_panic_in_the_handle() {
        let src = SysinfoSource::new(Duration::from_millis(200));
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _g = src.memory.lock().unwrap();
            panic!("read blew up mid-refresh");
        }));
        assert!(src.memory.is_poisoned());

        let first = src.read_memory().expect("read after poison");
        assert!(first.used_bytes <= first.total_bytes);
        assert!(src.read_memory().is_ok());
    }
}
