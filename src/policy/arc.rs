use log::debug;
use rustc_hash::FxHashMap;

use super::list::{KeyList, Slot};
use super::{BlockId, BlockStatus, CachePolicy, Victim};

/// Adaptive Replacement Cache.
///
/// `t1`/`t2` hold resident keys once/repeatedly seen, `b1`/`b2` remember
/// ghosts of keys recently evicted from them. Hits on a ghost list shift the
/// adaptation marker `p`, which balances how much of the capacity the recency
/// side (`t1`) may occupy.
///
/// Invariants, checked after every insertion:
/// `|t1| + |b1| <= c`, `|t1| + |b1| + |t2| + |b2| <= 2c`, `p <= c`.
#[derive(Debug)]
pub struct ArcPolicy {
    t1: KeyList,
    b1: KeyList,
    t2: KeyList,
    b2: KeyList,
    index: FxHashMap<BlockId, ArcSlot>,
    resident: FxHashMap<BlockId, BlockStatus>,
    capacity: usize,
    p: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArcQueue {
    T1,
    B1,
    T2,
    B2,
}

#[derive(Debug, Clone, Copy)]
struct ArcSlot {
    queue: ArcQueue,
    slot: Slot,
}

impl ArcPolicy {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be non-zero");
        ArcPolicy {
            t1: KeyList::new(),
            b1: KeyList::new(),
            t2: KeyList::new(),
            b2: KeyList::new(),
            index: FxHashMap::default(),
            resident: FxHashMap::default(),
            capacity,
            p: 0,
        }
    }

    /// Move `key` from whichever queue holds it to the MRU end of `t2`.
    fn promote_to_t2(&mut self, key: BlockId) {
        let entry = *self
            .index
            .get(&key)
            .expect("promoted key missing from arc index");
        match entry.queue {
            ArcQueue::T1 => {
                self.t1.remove(entry.slot);
            }
            ArcQueue::B1 => {
                self.b1.remove(entry.slot);
            }
            ArcQueue::B2 => {
                self.b2.remove(entry.slot);
            }
            ArcQueue::T2 => {
                self.t2.move_to_front(entry.slot);
                return;
            }
        }
        let slot = self.t2.push_front(key);
        self.index.insert(
            key,
            ArcSlot {
                queue: ArcQueue::T2,
                slot,
            },
        );
    }

    /// Evict one resident key, ghosting it on the matching B list, and return
    /// it. `in_b2` tells whether the access triggering the replacement hit
    /// the frequency ghost list.
    fn replace(&mut self, in_b2: bool) -> BlockId {
        let t1_len = self.t1.len();
        if t1_len > 0 && (t1_len > self.p || (t1_len == self.p && in_b2)) {
            let victim = self
                .t1
                .pop_back()
                .expect("t1 emptied during replacement");
            let slot = self.b1.push_front(victim);
            self.index.insert(
                victim,
                ArcSlot {
                    queue: ArcQueue::B1,
                    slot,
                },
            );
            debug!("arc: evict {victim} from t1 to b1");
            victim
        } else {
            let victim = self
                .t2
                .pop_back()
                .expect("t2 empty during replacement");
            let slot = self.b2.push_front(victim);
            self.index.insert(
                victim,
                ArcSlot {
                    queue: ArcQueue::B2,
                    slot,
                },
            );
            debug!("arc: evict {victim} from t2 to b2");
            victim
        }
    }

    fn check(&self) {
        assert!(
            self.resident.len() <= self.capacity,
            "arc cache exceeded capacity {}",
            self.capacity
        );
        assert!(self.p <= self.capacity, "arc marker exceeds capacity");
        assert!(
            self.t1.len() + self.b1.len() <= self.capacity,
            "arc L1 exceeds capacity"
        );
        assert!(
            self.t1.len() + self.b1.len() + self.t2.len() + self.b2.len() <= 2 * self.capacity,
            "arc L1 + L2 exceeds twice the capacity"
        );
        assert_eq!(
            self.resident.len(),
            self.t1.len() + self.t2.len(),
            "arc resident map desynced from t1/t2"
        );
    }
}

impl CachePolicy for ArcPolicy {
    fn put(&mut self, key: BlockId, status: BlockStatus) -> Option<Victim> {
        let mut victim_key = None;
        match self.index.get(&key).map(|entry| entry.queue) {
            // cache hit, promote toward the frequency side
            Some(ArcQueue::T1) | Some(ArcQueue::T2) => {
                self.promote_to_t2(key);
            }
            // recency ghost hit: grow the recency share
            Some(ArcQueue::B1) => {
                let delta = (self.b2.len() / self.b1.len()).max(1);
                self.p = (self.p + delta).min(self.capacity);
                victim_key = Some(self.replace(false));
                self.promote_to_t2(key);
            }
            // frequency ghost hit: shrink the recency share
            Some(ArcQueue::B2) => {
                let delta = (self.b1.len() / self.b2.len()).max(1);
                self.p = self.p.saturating_sub(delta);
                victim_key = Some(self.replace(true));
                self.promote_to_t2(key);
            }
            None => {
                let l1 = self.t1.len() + self.b1.len();
                let l2 = self.t2.len() + self.b2.len();
                if l1 == self.capacity {
                    if self.t1.len() < self.capacity {
                        let ghost = self
                            .b1
                            .pop_back()
                            .expect("b1 empty although l1 is at capacity");
                        self.index.remove(&ghost);
                        victim_key = Some(self.replace(false));
                    } else {
                        // b1 is empty, the LRU end of t1 falls out unghosted
                        let evicted = self.t1.pop_back().expect("t1 empty at capacity");
                        self.index.remove(&evicted);
                        victim_key = Some(evicted);
                    }
                } else if l1 + l2 >= self.capacity {
                    if l1 + l2 == 2 * self.capacity {
                        let ghost = self
                            .b2
                            .pop_back()
                            .expect("b2 empty although the directory is full");
                        self.index.remove(&ghost);
                    }
                    victim_key = Some(self.replace(false));
                }
                let slot = self.t1.push_front(key);
                self.index.insert(
                    key,
                    ArcSlot {
                        queue: ArcQueue::T1,
                        slot,
                    },
                );
            }
        }
        self.resident.insert(key, status);

        let victim = victim_key.map(|block| Victim {
            block,
            status: self
                .resident
                .remove(&block)
                .expect("arc victim missing from resident map"),
        });
        self.check();
        victim
    }

    fn get(&mut self, key: BlockId) -> Option<BlockStatus> {
        let status = *self.resident.get(&key)?;
        self.promote_to_t2(key);
        Some(status)
    }

    fn len(&self) -> usize {
        self.resident.len()
    }

    fn entries(&self) -> Vec<(BlockId, BlockStatus)> {
        self.resident
            .iter()
            .map(|(&key, &status)| (key, status))
            .collect()
    }
}
