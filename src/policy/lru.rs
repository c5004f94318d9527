use rustc_hash::FxHashMap;

use super::list::{KeyList, Slot};
use super::{BlockId, BlockStatus, CachePolicy, Victim};

/// Recency-order eviction. Both lookups and updates move the key to the MRU
/// end of the recency list; the LRU end is the victim.
#[derive(Debug)]
pub struct LruPolicy {
    recency: KeyList,
    entries: FxHashMap<BlockId, LruEntry>,
    capacity: usize,
}

#[derive(Debug)]
struct LruEntry {
    slot: Slot,
    status: BlockStatus,
}

impl LruPolicy {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be non-zero");
        LruPolicy {
            recency: KeyList::new(),
            entries: FxHashMap::default(),
            capacity,
        }
    }

    fn touch(&mut self, key: BlockId) {
        let slot = self
            .entries
            .get(&key)
            .expect("touched key missing from lru map")
            .slot;
        self.recency.move_to_front(slot);
    }

    fn check(&self) {
        assert!(
            self.entries.len() <= self.capacity,
            "lru cache exceeded capacity {}",
            self.capacity
        );
        assert_eq!(
            self.entries.len(),
            self.recency.len(),
            "lru recency list desynced from entry map"
        );
    }
}

impl CachePolicy for LruPolicy {
    fn put(&mut self, key: BlockId, status: BlockStatus) -> Option<Victim> {
        let mut victim = None;
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.status = status;
            self.touch(key);
        } else {
            if self.entries.len() + 1 > self.capacity {
                let victim_key = self
                    .recency
                    .pop_back()
                    .expect("lru recency list empty at capacity");
                let entry = self
                    .entries
                    .remove(&victim_key)
                    .expect("lru recency list desynced from entry map");
                victim = Some(Victim {
                    block: victim_key,
                    status: entry.status,
                });
            }
            let slot = self.recency.push_front(key);
            self.entries.insert(key, LruEntry { slot, status });
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
