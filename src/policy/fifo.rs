use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use super::{BlockId, BlockStatus, CachePolicy, Victim};

/// Insertion-order eviction. Updating an existing key changes its status but
/// keeps its queue position; lookups never reorder.
#[derive(Debug)]
pub struct FifoPolicy {
    queue: VecDeque<BlockId>,
    entries: FxHashMap<BlockId, BlockStatus>,
    capacity: usize,
}

impl FifoPolicy {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be non-zero");
        FifoPolicy {
            queue: VecDeque::with_capacity(capacity),
            entries: FxHashMap::default(),
            capacity,
        }
    }

    fn check(&self) {
        assert!(
            self.entries.len() <= self.capacity,
            "fifo cache exceeded capacity {}",
            self.capacity
        );
        assert_eq!(
            self.entries.len(),
            self.queue.len(),
            "fifo queue desynced from entry map"
        );
    }
}

impl CachePolicy for FifoPolicy {
    fn put(&mut self, key: BlockId, status: BlockStatus) -> Option<Victim> {
        let mut victim = None;
        if let Some(entry) = self.entries.get_mut(&key) {
            *entry = status;
        } else {
            if self.entries.len() + 1 > self.capacity {
                let victim_key = self
                    .queue
                    .pop_back()
                    .expect("fifo queue empty at capacity");
                let victim_status = self
                    .entries
                    .remove(&victim_key)
                    .expect("fifo queue desynced from entry map");
                victim = Some(Victim {
                    block: victim_key,
                    status: victim_status,
                });
            }
            self.queue.push_front(key);
            self.entries.insert(key, status);
        }
        self.check();
        victim
    }

    fn get(&mut self, key: BlockId) -> Option<BlockStatus> {
        self.entries.get(&key).copied()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn entries(&self) -> Vec<(BlockId, BlockStatus)> {
        self.entries.iter().map(|(&key, &status)| (key, status)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::BlockStatus::{Clean, Dirty};

    #[test]
    fn update_keeps_insertion_order() {
        let mut cache = FifoPolicy::new(2);
        assert!(cache.put(1, Clean).is_none());
        assert!(cache.put(2, Clean).is_none());
        assert_eq!(cache.get(1), Some(Clean));
        assert_eq!(cache.get(2), Some(Clean));

        // updating key 1 must not refresh its queue position
        assert!(cache.put(1, Dirty).is_none());
        assert_eq!(cache.get(1), Some(Dirty));

        let victim = cache.put(3, Clean).expect("cache is full");
        assert_eq!(victim.block, 1);
        assert_eq!(victim.status, Dirty);
        assert_eq!(cache.get(1), None);
        assert_eq!(cache.get(2), Some(Clean));
        assert_eq!(cache.get(3), Some(Clean));
    }

    #[test]
    fn missing_key() {
        let mut cache = FifoPolicy::new(2);
        cache.put(1, Clean);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(2), None);
    }

    #[test]
    fn gets_do_not_protect_from_eviction() {
        let mut cache = FifoPolicy::new(3);
        for key in 0..3 {
            cache.put(key, Clean);
        }
        // touching key 0 is a no-op under insertion order
        assert_eq!(cache.get(0), Some(Clean));
        let victim = cache.put(3, Clean).expect("cache is full");
        assert_eq!(victim.block, 0);
    }

    #[test]
    fn evicts_in_arrival_order() {
        let capacity = 10;
        let mut cache = FifoPolicy::new(capacity);
        for key in 0..capacity as BlockId + 5 {
            cache.put(key, Clean);
        }
        assert_eq!(cache.len(), capacity);
        for key in 0..5 {
            assert_eq!(cache.get(key), None);
        }
        for key in 5..15 {
            assert_eq!(cache.get(key), Some(Clean));
        }
    }
}
