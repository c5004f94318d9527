//! Modeled per-tier access costs.
//!
//! Costs are a pure table over `(tier, operation, access pattern)`. Every
//! query classifies the access against the tier's previous one, thereby
//! advancing the tier's sequentiality detector, and counts the operation in
//! the run [Stats].

use rand::Rng;

use crate::cache::AccessPattern;
use crate::config::{DiskMode, NvmLatencyClass};
use crate::hierarchy::{Tier, TierKind};
use crate::policy::BlockId;
use crate::stats::Stats;

/// Baseline DRAM access cost in nanoseconds.
const DRAM_NS: u64 = 100;
/// Fixed CPU cache access cost in nanoseconds.
const CPU_CACHE_NS: u64 = 10;
/// One in this many flush writes is counted as a device sync.
const SYNC_PERIOD: u32 = 10;

/// Read/write costs of one tier, split by access pattern.
#[derive(Debug, Clone, Copy)]
pub struct TierCost {
    pub seq_read: u64,
    pub rnd_read: u64,
    pub seq_write: u64,
    pub rnd_write: u64,
}

impl TierCost {
    const fn flat(ns: u64) -> Self {
        TierCost {
            seq_read: ns,
            rnd_read: ns,
            seq_write: ns,
            rnd_write: ns,
        }
    }

    fn read(&self, pattern: AccessPattern) -> u64 {
        match pattern {
            AccessPattern::Sequential => self.seq_read,
            AccessPattern::Random => self.rnd_read,
        }
    }

    fn write(&self, pattern: AccessPattern) -> u64 {
        match pattern {
            AccessPattern::Sequential => self.seq_write,
            AccessPattern::Random => self.rnd_write,
        }
    }
}

/// The cost table for one run.
#[derive(Debug, Clone)]
pub struct LatencyModel {
    costs: [TierCost; TierKind::COUNT],
}

impl LatencyModel {
    pub fn new(nvm: NvmLatencyClass, disk: DiskMode) -> Self {
        let (nvm_read, nvm_write) = nvm.factors();
        let mut costs = [TierCost::flat(0); TierKind::COUNT];
        costs[TierKind::CpuCache as usize] = TierCost::flat(CPU_CACHE_NS);
        costs[TierKind::Dram as usize] = TierCost::flat(DRAM_NS);
        costs[TierKind::Nvm as usize] = TierCost {
            seq_read: DRAM_NS * nvm_read,
            rnd_read: DRAM_NS * nvm_read,
            seq_write: DRAM_NS * nvm_write,
            rnd_write: DRAM_NS * nvm_write,
        };
        costs[TierKind::Disk as usize] = match disk {
            DiskMode::Ssd => TierCost {
                seq_read: 100 * 100,
                rnd_read: 100 * 100,
                seq_write: 250 * 100,
                rnd_write: 400 * 100,
            },
            DiskMode::Hdd => TierCost {
                seq_read: 1_000_000,
                rnd_read: 4_000_000,
                seq_write: 1_000_000,
                rnd_write: 10_000_000,
            },
        };
        LatencyModel { costs }
    }

    pub fn cost(&self, kind: TierKind) -> &TierCost {
        &self.costs[kind as usize]
    }

    /// Cost of reading `block` on `tier`. Counts the read and advances the
    /// tier's sequentiality detector.
    pub fn read(&self, tier: &mut Tier, stats: &mut Stats, block: BlockId) -> u64 {
        stats.count_read(tier.kind);
        let pattern = tier.cache.access_pattern(block);
        self.costs[tier.kind as usize].read(pattern)
    }

    /// Cost of writing `block` on `tier`. Counts the write; a flush write
    /// additionally counts a flush and, once in a while, a device sync.
    pub fn write(
        &self,
        tier: &mut Tier,
        stats: &mut Stats,
        rng: &mut impl Rng,
        block: BlockId,
        flush: bool,
    ) -> u64 {
        stats.count_write(tier.kind);
        if flush {
            stats.count_flush(tier.kind);
            if rng.gen_ratio(1, SYNC_PERIOD) {
                stats.count_sync(tier.kind);
            }
        }
        let pattern = tier.cache.access_pattern(block);
        self.costs[tier.kind as usize].write(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    use crate::config::PolicyKind;

    fn model() -> LatencyModel {
        LatencyModel::new(NvmLatencyClass::try_from(3).unwrap(), DiskMode::Ssd)
    }

    #[test]
    fn nvm_costs_scale_from_dram() {
        let model = model();
        // class 3 is read x2, write x4
        assert_eq!(model.cost(TierKind::Nvm).seq_read, 200);
        assert_eq!(model.cost(TierKind::Nvm).rnd_write, 400);
        assert_eq!(model.cost(TierKind::Dram).seq_read, 100);
        assert_eq!(model.cost(TierKind::CpuCache).rnd_write, 10);
    }

    #[test]
    fn disk_modes_differ() {
        let ssd = LatencyModel::new(NvmLatencyClass::try_from(1).unwrap(), DiskMode::Ssd);
        let hdd = LatencyModel::new(NvmLatencyClass::try_from(1).unwrap(), DiskMode::Hdd);
        assert_eq!(ssd.cost(TierKind::Disk).rnd_write, 40_000);
        assert_eq!(hdd.cost(TierKind::Disk).rnd_write, 10_000_000);
        assert_eq!(hdd.cost(TierKind::Disk).seq_read, 1_000_000);
    }

    #[test]
    fn queries_advance_the_detector_and_count() {
        let model = LatencyModel::new(NvmLatencyClass::try_from(1).unwrap(), DiskMode::Hdd);
        let mut tier = Tier::new(TierKind::Disk, PolicyKind::Fifo, 16);
        let mut stats = Stats::default();
        let mut rng = XorShiftRng::seed_from_u64(1);

        // first access is random, the adjacent follow-up is sequential
        assert_eq!(model.read(&mut tier, &mut stats, 10), 4_000_000);
        assert_eq!(model.read(&mut tier, &mut stats, 11), 1_000_000);
        // a write participates in the same run
        assert_eq!(model.write(&mut tier, &mut stats, &mut rng, 12, false), 1_000_000);
        assert_eq!(model.write(&mut tier, &mut stats, &mut rng, 40, false), 10_000_000);

        assert_eq!(stats.reads(TierKind::Disk), 2);
        assert_eq!(stats.writes(TierKind::Disk), 2);
        assert_eq!(stats.flushes(TierKind::Disk), 0);
    }

    #[test]
    fn flush_writes_count_flushes() {
        let model = model();
        let mut tier = Tier::new(TierKind::Nvm, PolicyKind::Fifo, 16);
        let mut stats = Stats::default();
        let mut rng = XorShiftRng::seed_from_u64(7);
        for block in 0..100 {
            model.write(&mut tier, &mut stats, &mut rng, block * 3, true);
        }
        assert_eq!(stats.writes(TierKind::Nvm), 100);
        assert_eq!(stats.flushes(TierKind::Nvm), 100);
        // syncs are sampled at one in SYNC_PERIOD
        assert!(stats.syncs(TierKind::Nvm) < 100);
    }
}
