use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use super::{BlockId, BlockStatus, CachePolicy, Victim};

const INIT_FREQUENCY: u64 = 1;

/// Frequency-order eviction. The victim is the least frequently used entry;
/// among equal frequencies the stalest entry goes first.
///
/// Ordering lives in a `BTreeSet` of `(frequency, stamp, key)` triples, where
/// the stamp is a monotonically increasing counter refreshed on every touch.
/// The set minimum is therefore always the eviction candidate.
#[derive(Debug)]
pub struct LfuPolicy {
    by_frequency: BTreeSet<(u64, u64, BlockId)>,
    entries: FxHashMap<BlockId, LfuEntry>,
    stamp: u64,
    capacity: usize,
}

#[derive(Debug)]
struct LfuEntry {
    frequency: u64,
    stamp: u64,
    status: BlockStatus,
}

impl LfuPolicy {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be non-zero");
        LfuPolicy {
            by_frequency: BTreeSet::new(),
            entries: FxHashMap::default(),
            stamp: 0,
            capacity,
        }
    }

    fn next_stamp(&mut self) -> u64 {
        self.stamp += 1;
        self.stamp
    }

    fn touch(&mut self, key: BlockId) {
        let stamp = self.next_stamp();
        let entry = self
            .entries
            .get_mut(&key)
            .expect("touched key missing from lfu map");
        assert!(
            self.by_frequency.remove(&(entry.frequency, entry.stamp, key)),
            "lfu frequency index desynced from entry map"
        );
        entry.frequency += 1;
        entry.stamp = stamp;
        self.by_frequency.insert((entry.frequency, entry.stamp, key));
    }

    fn check(&self) {
        assert!(
            self.entries.len() <= self.capacity,
            "lfu cache exceeded capacity {}",
            self.capacity
        );
        assert_eq!(
            self.entries.len(),
            self.by_frequency.len(),
            "lfu frequency index desynced from entry map"
        );
    }
}

impl CachePolicy for LfuPolicy {
    fn put(&mut self, key: BlockId, status: BlockStatus) -> Option<Victim> {
        let mut victim = None;
        if self.entries.contains_key(&key) {
            self.entries
                .get_mut(&key)
                .expect("checked above")
                .status = status;
            self.touch(key);
        } else {
            if self.entries.len() + 1 > self.capacity {
                let &(frequency, stamp, victim_key) = self
                    .by_frequency
                    .iter()
                    .next()
                    .expect("lfu frequency index empty at capacity");
                self.by_frequency.remove(&(frequency, stamp, victim_key));
                let entry = self
                    .entries
                    .remove(&victim_key)
                    .expect("lfu frequency index desynced from entry map");
                victim = Some(Victim {
                    block: victim_key,
                    status: entry.status,
                });
            }
            let stamp = self.next_stamp();
            self.by_frequency.insert((INIT_FREQUENCY, stamp, key));
            self.entries.insert(
                key,
                LfuEntry {
                    frequency: INIT_FREQUENCY,
                    stamp,
                    status,
                },
            );
        }
        self.check();
        victim
    }

    fn get(&mut self, key: BlockId) -> Option<BlockStatus> {
        let status = self.entries.get(&key)?.status;
        self.touch(key);
        Some(status)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn entries(&self) -> Vec<(BlockId, BlockStatus)> {
        self.entries
            .iter()
            .map(|(&key, entry)| (key, entry.status))
            .collect()
    }
}
