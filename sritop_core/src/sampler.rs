//! Background samplers: one periodic task per metric family, each publishing
//! into the shared snapshot store so readers never trigger a collection.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SamplerConfig;
use crate::error::{SampleError, SamplerError};
use crate::metrics::MetricSource;
use crate::rate::compute_rate;
use crate::ranker::top_by_cpu;
use crate::state::{SharedStore, SnapshotStore};
use crate::types::{
    Family, NetworkCounters, NetworkSample, Payload, ProcessSample, Reading, Snapshot,
};

/// Owns the family tasks and the store they write to.
pub struct Sampler<S: MetricSource> {
    source: Arc<S>,
    store: SharedStore,
    config: SamplerConfig,
    wake: Arc<Notify>,
    running: Option<Running>,
}

struct Running {
    cancel: CancellationToken,
    tasks: Vec<(Family, JoinHandle<()>)>,
}

/// Everything one family task needs besides its read/publish logic.
struct FamilyCtx {
    family: Family,
    period: Duration,
    store: SharedStore,
    cancel: CancellationToken,
    wake: Arc<Notify>,
}

impl<S: MetricSource> Sampler<S> {
    pub fn new(source: S, config: SamplerConfig) -> Self {
        Self::with_store(Arc::new(source), SnapshotStore::shared(), config)
    }

    pub fn with_store(source: Arc<S>, store: SharedStore, config: SamplerConfig) -> Self {
        Self {
            source,
            store,
            config,
            wake: Arc::new(Notify::new()),
            running: None,
        }
    }

    pub fn store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Spawn one task per family. Must be called from within a tokio runtime.
    /// Every family's first tick fires immediately.
    pub fn start(&mut self) -> Result<(), SamplerError> {
        if self.running.is_some() {
            return Err(SamplerError::AlreadyRunning);
        }
        self.config.validate()?;

        let cancel = CancellationToken::new();
        let ctx = |family: Family| FamilyCtx {
            family,
            period: self.config.cadences.get(family),
            store: Arc::clone(&self.store),
            cancel: cancel.child_token(),
            wake: Arc::clone(&self.wake),
        };

        let tasks = vec![
            (Family::Cpu, spawn_cpu_sampler(ctx(Family::Cpu), Arc::clone(&self.source))),
            (
                Family::Memory,
                spawn_memory_sampler(ctx(Family::Memory), Arc::clone(&self.source)),
            ),
            (
                Family::Disk,
                spawn_disk_sampler(
                    ctx(Family::Disk),
                    Arc::clone(&self.source),
                    self.config.disk_path.clone(),
                ),
            ),
            (
                Family::Network,
                spawn_network_sampler(ctx(Family::Network), Arc::clone(&self.source)),
            ),
            (
                Family::Processes,
                spawn_process_sampler(
                    ctx(Family::Processes),
                    Arc::clone(&self.source),
                    self.config.top_n,
                ),
            ),
        ];
        info!(
            cpu_ms = self.config.cadences.cpu.as_millis() as u64,
            memory_ms = self.config.cadences.memory.as_millis() as u64,
            disk_ms = self.config.cadences.disk.as_millis() as u64,
            network_ms = self.config.cadences.network.as_millis() as u64,
            processes_ms = self.config.cadences.processes.as_millis() as u64,
            "samplers started"
        );
        self.running = Some(Running { cancel, tasks });
        Ok(())
    }

    /// Ask every family for an extra tick right now. Cadence is unchanged.
    pub fn refresh_now(&self) {
        self.wake.notify_waiters();
    }

    /// Cancel all family tasks and wait once, up to the configured grace period.
    /// Tasks still alive after that are aborted and named in the error.
    pub async fn stop(&mut self) -> Result<(), SamplerError> {
        let Some(Running { cancel, tasks }) = self.running.take() else {
            return Ok(());
        };
        cancel.cancel();

        let deadline = Instant::now() + self.config.shutdown_grace;
        let mut pending = Vec::new();
        for (family, mut handle) in tasks {
            match timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(%family, "sampler task ended abnormally: {e}"),
                Err(_) => {
                    handle.abort();
                    pending.push(family);
                }
            }
        }
        if pending.is_empty() {
            info!("samplers stopped");
            Ok(())
        } else {
            Err(SamplerError::ShutdownIncomplete { pending })
        }
    }
}

impl<S: MetricSource> Drop for Sampler<S> {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
        }
    }
}

// CPU: the read blocks for the measurement window, so it gets its own task
fn spawn_cpu_sampler<S: MetricSource>(ctx: FamilyCtx, source: Arc<S>) -> JoinHandle<()> {
    run_family(
        ctx,
        move || source.read_cpu(),
        |res| res.map(Payload::Cpu),
    )
}

fn spawn_memory_sampler<S: MetricSource>(ctx: FamilyCtx, source: Arc<S>) -> JoinHandle<()> {
    run_family(
        ctx,
        move || source.read_memory(),
        |res| res.map(Payload::Memory),
    )
}

fn spawn_disk_sampler<S: MetricSource>(
    ctx: FamilyCtx,
    source: Arc<S>,
    path: std::path::PathBuf,
) -> JoinHandle<()> {
    run_family(
        ctx,
        move || source.read_disk(&path),
        |res| res.map(Payload::Disk),
    )
}

// Network: keeps the previous raw counters to turn them into a rate
fn spawn_network_sampler<S: MetricSource>(ctx: FamilyCtx, source: Arc<S>) -> JoinHandle<()> {
    let mut prev: Option<NetworkCounters> = None;
    run_family(
        ctx,
        move || source.read_network_counters(),
        move |res| {
            let curr = res?;
            let rate = prev.as_ref().and_then(|p| compute_rate(p, &curr));
            if prev.is_some() && rate.is_none() {
                debug!("network counters reset or clock stalled; rate skipped this interval");
            }
            prev = Some(curr);
            Ok(Payload::Network(NetworkSample {
                rate,
                bytes_sent: curr.bytes_sent,
                bytes_recv: curr.bytes_recv,
                timestamp: chrono::Utc::now(),
            }))
        },
    )
}

// Processes: rank the full listing down to the configured top-N
fn spawn_process_sampler<S: MetricSource>(
    ctx: FamilyCtx,
    source: Arc<S>,
    top_n: usize,
) -> JoinHandle<()> {
    run_family(
        ctx,
        move || source.list_processes(),
        move |res| {
            let all = res?;
            let total = all.len();
            Ok(Payload::Processes(ProcessSample {
                total,
                top: top_by_cpu(all, top_n),
                timestamp: chrono::Utc::now(),
            }))
        },
    )
}

/// Tick loop shared by all families.
///
/// `read` runs on a blocking worker; `publish` turns its result into a payload on
/// the task itself, so per-family state (like previous counters) needs no lock.
/// Ticks are sequential: the next one is not awaited before this one's store write.
fn run_family<T, R, P>(ctx: FamilyCtx, read: R, mut publish: P) -> JoinHandle<()>
where
    T: Send + 'static,
    R: Fn() -> Result<T, SampleError> + Send + Sync + 'static,
    P: FnMut(Result<T, SampleError>) -> Result<Payload, SampleError> + Send + 'static,
{
    let read = Arc::new(read);
    tokio::spawn(async move {
        let FamilyCtx {
            family,
            period,
            store,
            cancel,
            wake,
        } = ctx;
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // continue from whatever the store already holds so a restart never
        // makes a slot's version go backwards
        let mut version = store.get(family).map_or(0, |s| s.version);
        let mut failing = false;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
                _ = wake.notified() => debug!(%family, "refresh requested"),
            }

            let read = Arc::clone(&read);
            let joined = tokio::select! {
                biased;
                // abandon an in-flight read; its result is never written
                _ = cancel.cancelled() => break,
                joined = tokio::task::spawn_blocking(move || read()) => joined,
            };
            let result = joined.unwrap_or_else(|e| {
                Err(SampleError::Unavailable(format!("{family} reader failed: {e}")))
            });

            let reading = match publish(result) {
                Ok(payload) => {
                    if failing {
                        info!(%family, "sampling recovered");
                        failing = false;
                    }
                    Reading::Ready(payload)
                }
                Err(e) => {
                    if failing {
                        debug!(%family, error = %e, "sampling still failing");
                    } else {
                        warn!(%family, error = %e, "sampling failed");
                        failing = true;
                    }
                    Reading::Unavailable(e.to_string())
                }
            };

            version += 1;
            store.set(Snapshot::new(family, version, reading));
        }
        debug!(%family, "sampler task exiting");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CpuSample, DiskSample, MemorySample, ProcessInfo};

    struct NoSource;

    impl MetricSource for NoSource {
        fn read_cpu(&self) -> Result<CpuSample, SampleError> {
            Err(SampleError::Unavailable("none".into()))
        }
        fn read_memory(&self) -> Result<MemorySample, SampleError> {
            Err(SampleError::Unavailable("none".into()))
        }
        fn read_disk(&self, _: &std::path::Path) -> Result<DiskSample, SampleError> {
            Err(SampleError::Unavailable("none".into()))
        }
        fn read_network_counters(&self) -> Result<NetworkCounters, SampleError> {
            Err(SampleError::Unavailable("none".into()))
        }
        fn list_processes(&self) -> Result<Vec<ProcessInfo>, SampleError> {
            Err(SampleError::Unavailable("none".into()))
        }
    }

    #[tokio::test]
    async fn stop_names_and_aborts_tasks_that_ignore_cancellation() {
        let mut config = SamplerConfig::default();
        config.shutdown_grace = Duration::from_millis(50);
        let mut sampler = Sampler::new(NoSource, config);

        let stuck = tokio::spawn(std::future::pending::<()>());
        let abort = stuck.abort_handle();
        let done = tokio::spawn(async {});
        sampler.running = Some(Running {
            cancel: CancellationToken::new(),
            tasks: vec![(Family::Memory, done), (Family::Disk, stuck)],
        });

        match sampler.stop().await {
            Err(SamplerError::ShutdownIncomplete { pending }) => {
                assert_eq!(pending, vec![Family::Disk]);
            }
            other => panic!("expected ShutdownIncomplete, got {other:?}"),
        }
        assert!(!sampler.is_running());
        for _ in 0..10 {
            if abort.is_finished() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(abort.is_finished());
    }
}
