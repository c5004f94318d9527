//! Uniform façade over the policy variants, one per tier, plus the per-tier
//! sequentiality detector.

use crate::config::PolicyKind;
use crate::policy::{BlockId, BlockStatus, CachePolicy, Policy, Victim};

/// Classification of an access relative to the previous access on the same
/// tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPattern {
    Sequential,
    Random,
}

/// One tier's cache: an eviction policy plus the block id of the previous
/// access, for sequential/random classification.
#[derive(Debug)]
pub struct TierCache {
    policy: Policy,
    capacity: usize,
    prev_block: Option<BlockId>,
}

impl TierCache {
    pub fn new(kind: PolicyKind, capacity: usize) -> Self {
        TierCache {
            policy: Policy::new(kind, capacity),
            capacity,
            prev_block: None,
        }
    }

    pub fn put(&mut self, block: BlockId, status: BlockStatus) -> Option<Victim> {
        self.policy.put(block, status)
    }

    pub fn get(&mut self, block: BlockId) -> Option<BlockStatus> {
        self.policy.get(block)
    }

    pub fn len(&self) -> usize {
        self.policy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policy.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy_kind(&self) -> PolicyKind {
        self.policy.kind()
    }

    pub fn entries(&self) -> Vec<(BlockId, BlockStatus)> {
        self.policy.entries()
    }

    pub fn occupied_percent(&self) -> usize {
        self.len() * 100 / self.capacity
    }

    /// Classify the upcoming access to `next` and advance the detector.
    /// Adjacent block ids in either direction count as sequential; the very
    /// first access is random.
    pub fn access_pattern(&mut self, next: BlockId) -> AccessPattern {
        let sequential = self
            .prev_block
            .map_or(false, |prev| prev.abs_diff(next) == 1);
        self.prev_block = Some(next);
        if sequential {
            AccessPattern::Sequential
        } else {
            AccessPattern::Random
        }
    }

    pub fn is_sequential(&mut self, next: BlockId) -> bool {
        self.access_pattern(next) == AccessPattern::Sequential
    }
}
