//! The ordered tier list and block location routines.

use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::cache::TierCache;
use crate::config::{HierarchyKind, PolicyKind, SimConfig};
use crate::policy::BlockId;

/// CPU cache capacity in blocks.
pub const CPU_CACHE_BLOCKS: usize = 32;
/// Disk capacity in blocks when the disk is not the final backing store.
pub const DISK_BLOCKS: usize = 64 * 1024;
/// Capacity of whichever tier ends the hierarchy; it must hold the whole
/// working set.
pub const LAST_TIER_BLOCKS: usize = 1024 * 1024;

/// The four device classes a hierarchy can be composed of, fastest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TierKind {
    CpuCache,
    Dram,
    Nvm,
    Disk,
}

impl TierKind {
    pub const COUNT: usize = 4;

    /// Volatile tiers lose their contents; dirty victims leaving them must be
    /// demoted.
    pub fn is_volatile(self) -> bool {
        matches!(self, TierKind::CpuCache | TierKind::Dram)
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TierKind::CpuCache => "CACHE",
            TierKind::Dram => "DRAM",
            TierKind::Nvm => "NVM",
            TierKind::Disk => "DISK",
        })
    }
}

/// Which tiers a location query scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierSet {
    /// Tiers acting as memory: the volatile ones plus NVM.
    Memory,
    /// Tiers providing durability: NVM and disk.
    Storage,
}

/// One level of the hierarchy.
#[derive(Debug)]
pub struct Tier {
    pub kind: TierKind,
    pub cache: TierCache,
}

impl Tier {
    pub fn new(kind: TierKind, policy: PolicyKind, capacity: usize) -> Self {
        Tier {
            kind,
            cache: TierCache::new(policy, capacity),
        }
    }
}

/// An ordered list of tiers, fastest first, with designated memory and
/// storage subsets. The final tier is the backing store.
#[derive(Debug)]
pub struct Hierarchy {
    tiers: Vec<Tier>,
    memory: Vec<TierKind>,
    storage: Vec<TierKind>,
}

impl Hierarchy {
    /// Build a hierarchy from explicit `(kind, capacity)` pairs. The pairs
    /// must be ordered fastest to slowest and non-empty.
    pub fn new(
        policy: PolicyKind,
        tiers: &[(TierKind, usize)],
        memory: &[TierKind],
        storage: &[TierKind],
    ) -> Self {
        assert!(!tiers.is_empty(), "a hierarchy needs at least one tier");
        assert!(
            tiers.iter().tuple_windows().all(|(fast, slow)| fast.0 < slow.0),
            "tiers must be ordered fastest to slowest without duplicates"
        );
        Hierarchy {
            tiers: tiers
                .iter()
                .map(|&(kind, capacity)| Tier::new(kind, policy, capacity))
                .collect(),
            memory: memory.to_vec(),
            storage: storage.to_vec(),
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        use TierKind::*;

        let dram = config.size_class.blocks();
        let nvm = dram * config.ratio_class.ratio();
        let (mut tiers, memory, storage): (Vec<(TierKind, usize)>, Vec<TierKind>, Vec<TierKind>) =
            match config.hierarchy {
                HierarchyKind::Nvm => (
                    vec![(CpuCache, CPU_CACHE_BLOCKS), (Nvm, nvm)],
                    vec![CpuCache, Nvm],
                    vec![Nvm],
                ),
                HierarchyKind::DramNvm => (
                    vec![(CpuCache, CPU_CACHE_BLOCKS), (Dram, dram), (Nvm, nvm)],
                    vec![CpuCache, Dram, Nvm],
                    vec![Nvm],
                ),
                HierarchyKind::DramDisk => (
                    vec![(CpuCache, CPU_CACHE_BLOCKS), (Dram, dram), (Disk, DISK_BLOCKS)],
                    vec![CpuCache, Dram],
                    vec![Disk],
                ),
                HierarchyKind::NvmDisk => (
                    vec![(CpuCache, CPU_CACHE_BLOCKS), (Nvm, nvm), (Disk, DISK_BLOCKS)],
                    vec![CpuCache, Nvm],
                    vec![Nvm, Disk],
                ),
                HierarchyKind::DramNvmDisk => (
                    vec![
                        (CpuCache, CPU_CACHE_BLOCKS),
                        (Dram, dram),
                        (Nvm, nvm),
                        (Disk, DISK_BLOCKS),
                    ],
                    vec![CpuCache, Dram, Nvm],
                    vec![Nvm, Disk],
                ),
            };
        tiers
            .last_mut()
            .expect("hierarchy plans are non-empty")
            .1 = LAST_TIER_BLOCKS;
        Hierarchy::new(config.policy, &tiers, &memory, &storage)
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// The fastest tier; fresh blocks enter here.
    pub fn top_kind(&self) -> TierKind {
        self.tiers.first().expect("hierarchy is non-empty").kind
    }

    /// The backing store.
    pub fn last_kind(&self) -> TierKind {
        self.tiers.last().expect("hierarchy is non-empty").kind
    }

    pub fn exists(&self, kind: TierKind) -> bool {
        self.tiers.iter().any(|tier| tier.kind == kind)
    }

    pub fn tier(&self, kind: TierKind) -> &Tier {
        self.tiers
            .iter()
            .find(|tier| tier.kind == kind)
            .unwrap_or_else(|| panic!("tier {kind} not part of this hierarchy"))
    }

    pub fn tier_mut(&mut self, kind: TierKind) -> &mut Tier {
        self.tiers
            .iter_mut()
            .find(|tier| tier.kind == kind)
            .unwrap_or_else(|| panic!("tier {kind} not part of this hierarchy"))
    }

    /// Scan the given subset in order and return the first tier whose cache
    /// holds `block`. The hit counts as an access on that tier.
    pub fn locate(&mut self, block: BlockId, set: TierSet) -> Option<TierKind> {
        let count = match set {
            TierSet::Memory => self.memory.len(),
            TierSet::Storage => self.storage.len(),
        };
        for position in 0..count {
            let kind = match set {
                TierSet::Memory => self.memory[position],
                TierSet::Storage => self.storage[position],
            };
            if self.tier_mut(kind).cache.get(block).is_some() {
                return Some(kind);
            }
        }
        None
    }

    /// Demotion target below `source`, depending on which tiers exist.
    pub fn lower_tier_of(&self, source: TierKind) -> TierKind {
        match source {
            TierKind::CpuCache => {
                if self.exists(TierKind::Dram) {
                    TierKind::Dram
                } else if self.exists(TierKind::Nvm) {
                    TierKind::Nvm
                } else {
                    TierKind::Disk
                }
            }
            TierKind::Dram => {
                if self.exists(TierKind::Nvm) {
                    TierKind::Nvm
                } else {
                    TierKind::Disk
                }
            }
            TierKind::Nvm => TierKind::Disk,
            TierKind::Disk => panic!("the disk tier has nothing below it"),
        }
    }
}

/// Render a block count as a capacity, assuming 4 KiB blocks.
pub fn format_capacity(blocks: usize) -> String {
    let kib = blocks * 4;
    if kib < 1024 {
        format!("{kib} KB")
    } else if kib < 1024 * 1024 {
        format!("{} MB", kib / 1024)
    } else {
        format!("{} GB", kib / (1024 * 1024))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::BlockStatus::Clean;

    fn three_tier() -> Hierarchy {
        Hierarchy::new(
            PolicyKind::Fifo,
            &[(TierKind::Dram, 4), (TierKind::Nvm, 8), (TierKind::Disk, 16)],
            &[TierKind::Dram, TierKind::Nvm],
            &[TierKind::Nvm, TierKind::Disk],
        )
    }

    #[test]
    fn locate_scans_fast_tiers_first() {
        let mut hierarchy = three_tier();
        hierarchy.tier_mut(TierKind::Nvm).cache.put(7, Clean);
        hierarchy.tier_mut(TierKind::Dram).cache.put(7, Clean);
        assert_eq!(hierarchy.locate(7, TierSet::Memory), Some(TierKind::Dram));

        hierarchy.tier_mut(TierKind::Disk).cache.put(9, Clean);
        assert_eq!(hierarchy.locate(9, TierSet::Memory), None);
        assert_eq!(hierarchy.locate(9, TierSet::Storage), Some(TierKind::Disk));
    }

    #[test]
    fn demotion_targets_respect_composition() {
        let full = Hierarchy::from_config(&SimConfig::default());
        assert_eq!(full.lower_tier_of(TierKind::CpuCache), TierKind::Dram);
        assert_eq!(full.lower_tier_of(TierKind::Dram), TierKind::Nvm);
        assert_eq!(full.lower_tier_of(TierKind::Nvm), TierKind::Disk);

        let no_dram = Hierarchy::new(
            PolicyKind::Fifo,
            &[(TierKind::CpuCache, 2), (TierKind::Nvm, 8)],
            &[TierKind::CpuCache, TierKind::Nvm],
            &[TierKind::Nvm],
        );
        assert_eq!(no_dram.lower_tier_of(TierKind::CpuCache), TierKind::Nvm);

        let no_nvm = Hierarchy::new(
            PolicyKind::Fifo,
            &[(TierKind::Dram, 4), (TierKind::Disk, 16)],
            &[TierKind::Dram],
            &[TierKind::Disk],
        );
        assert_eq!(no_nvm.lower_tier_of(TierKind::Dram), TierKind::Disk);
    }

    #[test]
    fn config_hierarchies_end_in_the_backing_store() {
        for kind in [
            HierarchyKind::Nvm,
            HierarchyKind::DramNvm,
            HierarchyKind::DramDisk,
            HierarchyKind::NvmDisk,
            HierarchyKind::DramNvmDisk,
        ] {
            let config = SimConfig {
                hierarchy: kind,
                ..SimConfig::default()
            };
            let hierarchy = Hierarchy::from_config(&config);
            assert_eq!(hierarchy.top_kind(), TierKind::CpuCache);
            let last = hierarchy.last_kind();
            assert_eq!(hierarchy.tier(last).cache.capacity(), LAST_TIER_BLOCKS);
        }
    }

    #[test]
    fn capacities_render_in_human_units() {
        assert_eq!(format_capacity(32), "128 KB");
        assert_eq!(format_capacity(4096), "16 MB");
        assert_eq!(format_capacity(1024 * 1024), "4 GB");
    }
}
