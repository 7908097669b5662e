//! Shared snapshot store: one atomically replaced slot per metric family.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::types::{Family, Snapshot};

pub type SharedStore = Arc<SnapshotStore>;

/// Latest snapshot per family.
///
/// Each slot is an `ArcSwapOption`, so `set` is a single pointer swap and `get`
/// never waits on a writer: a reader gets either the whole previous snapshot or
/// the whole new one. Slots are independent of each other.
pub struct SnapshotStore {
    slots: [ArcSwapOption<Snapshot>; 5],
}

/// All five slots read back to back. Each entry is internally consistent;
/// entries may come from different sampling instants.
#[derive(Debug, Clone, Default)]
pub struct StoreView {
    pub cpu: Option<Arc<Snapshot>>,
    pub memory: Option<Arc<Snapshot>>,
    pub disk: Option<Arc<Snapshot>>,
    pub network: Option<Arc<Snapshot>>,
    pub processes: Option<Arc<Snapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| ArcSwapOption::empty()),
        }
    }

    pub fn shared() -> SharedStore {
        Arc::new(Self::new())
    }

    /// `None` until the family has published its first snapshot.
    pub fn get(&self, family: Family) -> Option<Arc<Snapshot>> {
        self.slots[family.index()].load_full()
    }

    /// Replace the slot named by `snapshot.family`.
    pub fn set(&self, snapshot: Snapshot) {
        let idx = snapshot.family.index();
        self.slots[idx].store(Some(Arc::new(snapshot)));
    }

    pub fn view(&self) -> StoreView {
        StoreView {
            cpu: self.get(Family::Cpu),
            memory: self.get(Family::Memory),
            disk: self.get(Family::Disk),
            network: self.get(Family::Network),
            processes: self.get(Family::Processes),
        }
    }

    /// True once every family has published at least once.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|s| s.load().is_some())
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreView {
    pub fn get(&self, family: Family) -> Option<&Arc<Snapshot>> {
        match family {
            Family::Cpu => self.cpu.as_ref(),
            Family::Memory => self.memory.as_ref(),
            Family::Disk => self.disk.as_ref(),
            Family::Network => self.network.as_ref(),
            Family::Processes => self.processes.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MemorySample, Payload, Reading};
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn memory_snapshot(version: u64) -> Snapshot {
        // every field derived from `version`, so a mixed value is detectable
        Snapshot::new(
            Family::Memory,
            version,
            Reading::Ready(Payload::Memory(MemorySample {
                percent: (version % 100) as f32,
                used_bytes: version * 2,
                total_bytes: version * 4,
                timestamp: Utc::now(),
            })),
        )
    }

    #[test]
    fn empty_until_first_set() {
        let store = SnapshotStore::new();
        for f in Family::ALL {
            assert!(store.get(f).is_none());
        }
        assert!(!store.is_complete());

        store.set(memory_snapshot(1));
        let got = store.get(Family::Memory).unwrap();
        assert_eq!(got.version, 1);
        assert!(store.get(Family::Cpu).is_none());
    }

    #[test]
    fn set_replaces_only_its_slot() {
        let store = SnapshotStore::new();
        store.set(memory_snapshot(1));
        store.set(Snapshot::new(
            Family::Disk,
            1,
            Reading::Unavailable("not mounted".into()),
        ));
        store.set(memory_snapshot(2));

        assert_eq!(store.get(Family::Memory).unwrap().version, 2);
        let disk = store.get(Family::Disk).unwrap();
        assert_eq!(disk.unavailable_reason(), Some("not mounted"));

        let view = store.view();
        assert_eq!(view.get(Family::Memory).unwrap().version, 2);
        assert!(view.get(Family::Network).is_none());
    }

    #[test]
    fn readers_hold_old_snapshot_after_replace() {
        let store = SnapshotStore::new();
        store.set(memory_snapshot(1));
        let held = store.get(Family::Memory).unwrap();
        store.set(memory_snapshot(2));
        assert_eq!(held.version, 1);
        assert_eq!(store.get(Family::Memory).unwrap().version, 2);
    }

    #[test]
    fn complete_once_all_families_published() {
        let store = SnapshotStore::new();
        for f in Family::ALL {
            store.set(Snapshot::new(f, 1, Reading::Unavailable("x".into())));
        }
        assert!(store.is_complete());
    }

    #[test]
    fn concurrent_reads_never_tear() {
        let store = SnapshotStore::shared();
        store.set(memory_snapshot(1));
        let done = Arc::new(AtomicBool::new(false));

        let writer = {
            let store = Arc::clone(&store);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                for v in 2..20_000u64 {
                    store.set(memory_snapshot(v));
                }
                done.store(true, Ordering::Release);
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                let done = Arc::clone(&done);
                std::thread::spawn(move || {
                    let mut last = 0u64;
                    while !done.load(Ordering::Acquire) {
                        let snap = store.get(Family::Memory).unwrap();
                        let m = snap.memory().unwrap();
                        assert_eq!(m.used_bytes, snap.version * 2);
                        assert_eq!(m.total_bytes, snap.version * 4);
                        assert_eq!(m.percent, (snap.version % 100) as f32);
                        assert!(snap.version >= last, "version went backwards");
                        last = snap.version;
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
    }
}
