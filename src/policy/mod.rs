//! Bounded key/value caches with deterministic victim selection.
//!
//! All four eviction policies share one contract: [CachePolicy::put] of a
//! new key past capacity selects exactly one victim and hands it back to the
//! caller together with its status, [CachePolicy::get] reports a miss as
//! `None` and counts a hit as a use where the policy tracks uses. Policies
//! abort on violations of their internal invariants; such a state is a bug,
//! not a runtime condition.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use crate::config::PolicyKind;

mod arc;
mod fifo;
mod lfu;
mod list;
mod lru;

pub use self::{arc::ArcPolicy, fifo::FifoPolicy, lfu::LfuPolicy, lru::LruPolicy};

/// Identifier of a logical block.
pub type BlockId = u64;

/// Persistence state of a block relative to the durable tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockStatus {
    /// The durable tier holds an up-to-date copy.
    Clean,
    /// The block carries writes not yet propagated downward.
    Dirty,
}

/// A key evicted on overflow, together with its status at eviction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Victim {
    pub block: BlockId,
    pub status: BlockStatus,
}

/// Contract shared by the four eviction policies.
#[enum_dispatch]
pub trait CachePolicy {
    /// Insert or update `key`. Inserting a new key past capacity evicts and
    /// returns a victim; updating an existing key never does.
    fn put(&mut self, key: BlockId, status: BlockStatus) -> Option<Victim>;

    /// Look up `key`. A hit updates recency/frequency metadata where the
    /// policy keeps any; a miss returns `None`.
    fn get(&mut self, key: BlockId) -> Option<BlockStatus>;

    /// Number of live entries.
    fn len(&self) -> usize;

    /// Snapshot of the live entries, in no particular order.
    fn entries(&self) -> Vec<(BlockId, BlockStatus)>;
}

/// Sum over the four policy implementations, keeping dispatch cost flat.
#[enum_dispatch(CachePolicy)]
#[derive(Debug)]
pub enum Policy {
    Fifo(FifoPolicy),
    Lru(LruPolicy),
    Lfu(LfuPolicy),
    Arc(ArcPolicy),
}

impl Policy {
    pub fn new(kind: PolicyKind, capacity: usize) -> Self {
        match kind {
            PolicyKind::Fifo => FifoPolicy::new(capacity).into(),
            PolicyKind::Lru => LruPolicy::new(capacity).into(),
            PolicyKind::Lfu => LfuPolicy::new(capacity).into(),
            PolicyKind::Arc => ArcPolicy::new(capacity).into(),
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            Policy::Fifo(_) => PolicyKind::Fifo,
            Policy::Lru(_) => PolicyKind::Lru,
            Policy::Lfu(_) => PolicyKind::Lfu,
            Policy::Arc(_) => PolicyKind::Arc,
        }
    }
}
