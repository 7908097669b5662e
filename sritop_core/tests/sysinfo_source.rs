//! Smoke tests against the real host through sysinfo.

use std::time::Duration;

use sritop_core::{
    Family, MetricSource, SampleError, Sampler, SamplerConfig, SysinfoSource,
};

fn source() -> SysinfoSource {
    SysinfoSource::new(Duration::from_millis(250))
}

#[test]
fn cpu_percent_in_range() {
    let cpu = source().read_cpu().expect("cpu read");
    assert!((0.0..=100.0).contains(&cpu.percent), "{}", cpu.percent);
    assert!(cpu.per_core.iter().all(|c| (0.0..=100.0).contains(c)));
}

#[test]
fn memory_used_within_total() {
    let mem = source().read_memory().expect("memory read");
    assert!(mem.total_bytes > 0);
    assert!(mem.used_bytes <= mem.total_bytes);
    assert!((0.0..=100.0).contains(&mem.percent));
}

#[test]
fn disk_for_existing_path_is_consistent() {
    let dir = tempfile::tempdir().expect("tempdir");
    match source().read_disk(dir.path()) {
        Ok(disk) => {
            assert!(disk.used_bytes <= disk.total_bytes);
            assert!((0.0..=100.0).contains(&disk.percent));
            assert!(!disk.mount_point.is_empty());
        }
        // some sandboxes hide the filesystem backing the temp dir from the mount table
        Err(SampleError::NotMounted(_)) => {}
        Err(e) => panic!("unexpected disk error: {e}"),
    }
}

#[test]
fn disk_for_missing_path_is_an_error() {
    let err = source()
        .read_disk(std::path::Path::new("/definitely/not/a/mount/point"))
        .unwrap_err();
    assert!(matches!(err, SampleError::PathUnreachable { .. }), "{err}");
}

#[test]
fn network_counters_do_not_go_backwards_quickly() {
    let src = source();
    let a = src.read_network_counters().expect("first read");
    std::thread::sleep(Duration::from_millis(50));
    let b = src.read_network_counters().expect("second read");
    assert!(b.timestamp > a.timestamp);
}

#[test]
fn process_listing_contains_this_process() {
    let procs = source().list_processes().expect("process list");
    let me = std::process::id();
    let mine = procs.iter().find(|p| p.pid == me).expect("own pid listed");
    assert!((0.0..=100.0).contains(&mine.cpu()));
    assert!((0.0..=100.0).contains(&mine.mem()));
    assert!(procs.iter().all(|p| (0.0..=100.0).contains(&p.cpu())));
}

#[cfg(target_os = "linux")]
#[test]
fn threads_are_not_listed_as_processes() {
    use std::sync::{Arc, Barrier};

    let release = Arc::new(Barrier::new(5));
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let release = Arc::clone(&release);
            std::thread::spawn(move || {
                release.wait();
            })
        })
        .collect();

    let me = std::process::id();
    let tids: Vec<u32> = std::fs::read_dir("/proc/self/task")
        .expect("task dir")
        .filter_map(|e| e.ok()?.file_name().to_str()?.parse().ok())
        .filter(|&tid| tid != me)
        .collect();

    let procs = source().list_processes().expect("process list");
    release.wait();
    for w in workers {
        w.join().unwrap();
    }

    assert!(tids.len() >= 4, "expected worker threads, saw {tids:?}");
    let leaked: Vec<u32> = tids
        .iter()
        .copied()
        .filter(|tid| procs.iter().any(|p| p.pid == *tid))
        .collect();
    assert!(leaked.is_empty(), "threads listed as processes: {leaked:?}");
    assert_eq!(procs.iter().filter(|p| p.pid == me).count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn end_to_end_with_real_host() {
    let config = SamplerConfig::default();
    let mut sampler = Sampler::new(SysinfoSource::new(config.cpu_window), config);
    let store = sampler.store();
    sampler.start().unwrap();

    // the cpu read alone takes the sampling window, so nothing is there yet
    assert!(store.get(Family::Cpu).is_none());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let cpu = store.get(Family::Cpu).expect("cpu after one interval");
    let pct = cpu.cpu().expect("cpu payload").percent;
    assert!((0.0..=100.0).contains(&pct));
    let mem = store.get(Family::Memory).expect("memory after one interval");
    let m = mem.memory().expect("memory payload");
    assert!(m.used_bytes <= m.total_bytes);

    sampler.stop().await.expect("clean shutdown");
}
