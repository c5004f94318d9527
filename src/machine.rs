//! The simulated machine: hierarchy, cost model, counters and the block
//! movement engine.
//!
//! All state of a run lives here and is passed around explicitly, so several
//! machines can be driven independently within one process.

use std::fmt;

use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::config::SimConfig;
use crate::emulation::{FileBackend, IoBackend, PhysicalTimer};
use crate::error::Result;
use crate::hierarchy::{format_capacity, Hierarchy, TierKind, TierSet};
use crate::latency::LatencyModel;
use crate::policy::{BlockId, BlockStatus, Victim};
use crate::stats::Stats;

#[derive(Debug)]
pub struct Machine {
    pub hierarchy: Hierarchy,
    pub latency: LatencyModel,
    pub stats: Stats,
    /// Modeled time accumulated since the last reset.
    pub logical_ns: u128,
    /// Wall-clock time spent in emulated I/O since the last reset.
    pub physical: PhysicalTimer,
    backend: Option<Box<dyn IoBackend>>,
    migration_frequency: u64,
    rng: StdRng,
}

impl Machine {
    pub fn new(
        hierarchy: Hierarchy,
        latency: LatencyModel,
        migration_frequency: u64,
        seed: u64,
    ) -> Self {
        assert!(
            migration_frequency >= 1,
            "migration frequency must be at least 1"
        );
        Machine {
            hierarchy,
            latency,
            stats: Stats::default(),
            logical_ns: 0,
            physical: PhysicalTimer::default(),
            backend: None,
            migration_frequency,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_config(config: &SimConfig) -> Result<Self> {
        let hierarchy = Hierarchy::from_config(config);
        let latency = LatencyModel::new(config.nvm_latency, config.disk);
        let mut machine = Machine::new(hierarchy, latency, config.migration_frequency, config.seed);
        if config.emulate {
            let kinds: Vec<TierKind> = machine
                .hierarchy
                .tiers()
                .iter()
                .map(|tier| tier.kind)
                .collect();
            let backend =
                FileBackend::create(&config.emulation_dir, &kinds, config.large_file_mode)?;
            machine.set_backend(Box::new(backend));
        }
        Ok(machine)
    }

    /// Attach a physical I/O sink mirroring every modeled device access.
    pub fn set_backend(&mut self, backend: Box<dyn IoBackend>) {
        self.backend = Some(backend);
    }

    /// Clear counters and clocks between the warm-up and measurement phases.
    pub fn reset_measurement(&mut self) {
        self.stats.reset();
        self.logical_ns = 0;
        self.physical.reset();
    }

    pub fn logical_seconds(&self) -> f64 {
        self.logical_ns as f64 / 1e9
    }

    /// Live entries summed over all tiers.
    pub fn total_resident(&self) -> usize {
        self.hierarchy
            .tiers()
            .iter()
            .map(|tier| tier.cache.len())
            .sum()
    }

    fn read_cost(&mut self, kind: TierKind, block: BlockId) -> Result<u64> {
        let tier = self.hierarchy.tier_mut(kind);
        let ns = self.latency.read(tier, &mut self.stats, block);
        if let Some(backend) = self.backend.as_mut() {
            self.physical.time(|| backend.read(kind, block))?;
        }
        Ok(ns)
    }

    fn write_cost(&mut self, kind: TierKind, block: BlockId, flush: bool) -> Result<u64> {
        let tier = self.hierarchy.tier_mut(kind);
        let ns = self
            .latency
            .write(tier, &mut self.stats, &mut self.rng, block, flush);
        if let Some(backend) = self.backend.as_mut() {
            self.physical.time(|| backend.write(kind, block, flush))?;
        }
        Ok(ns)
    }

    /// Move a block image into `destination`, accumulating a read at the
    /// source and a write at the destination, and cascade any eviction this
    /// causes further down the hierarchy. A `None` source creates the block
    /// out of thin air. The backing store only ever holds clean copies.
    pub fn copy(
        &mut self,
        source: Option<TierKind>,
        destination: TierKind,
        block: BlockId,
        status: BlockStatus,
        flush: bool,
    ) -> Result<()> {
        debug!(
            "copy {block}: {} -> {destination} ({status:?})",
            source.map_or_else(|| "NEW".to_string(), |kind| kind.to_string()),
        );
        self.stats.count_movement(source, destination);

        let final_status = if destination == self.hierarchy.last_kind() {
            BlockStatus::Clean
        } else {
            status
        };
        let victim = self
            .hierarchy
            .tier_mut(destination)
            .cache
            .put(block, final_status);

        if let Some(kind) = source {
            let ns = self.read_cost(kind, block)?;
            self.logical_ns += u128::from(ns);
        }
        let ns = self.write_cost(destination, block, flush)?;
        self.logical_ns += u128::from(ns);

        if let Some(victim) = victim {
            self.move_victim(destination, victim)?;
        }
        Ok(())
    }

    /// Handle a victim evicted from `source`. Dirty blocks leaving a volatile
    /// tier and any block leaving NVM are demoted one tier; everything else
    /// is dropped, its copy below stays authoritative.
    fn move_victim(&mut self, source: TierKind, victim: Victim) -> Result<()> {
        let dirty_volatile = source.is_volatile() && victim.status == BlockStatus::Dirty;
        let nvm_spill = source == TierKind::Nvm && source != self.hierarchy.last_kind();
        if dirty_volatile || nvm_spill {
            let destination = self.hierarchy.lower_tier_of(source);
            self.copy(Some(source), destination, victim.block, victim.status, false)
        } else {
            debug!(
                "drop victim {} evicted from {source} ({:?})",
                victim.block, victim.status
            );
            Ok(())
        }
    }

    /// Promotion cascade: fetch the block from storage if no memory tier
    /// holds it, occasionally lift NVM residents into DRAM, and always mirror
    /// the block into the CPU cache where one exists.
    pub fn bring_to_memory(&mut self, block: BlockId) -> Result<()> {
        if self.hierarchy.locate(block, TierSet::Memory).is_none() {
            if let Some(source) = self.hierarchy.locate(block, TierSet::Storage) {
                let destination = if self.hierarchy.exists(TierKind::Nvm) {
                    TierKind::Nvm
                } else {
                    TierKind::Dram
                };
                self.copy(Some(source), destination, block, BlockStatus::Clean, false)?;
            }
        }

        if self.hierarchy.locate(block, TierSet::Memory) == Some(TierKind::Nvm)
            && self.hierarchy.exists(TierKind::Dram)
            && self.rng.gen_range(0..self.migration_frequency) == 0
        {
            self.copy(
                Some(TierKind::Nvm),
                TierKind::Dram,
                block,
                BlockStatus::Clean,
                false,
            )?;
        }

        if self.hierarchy.exists(TierKind::CpuCache) {
            match self.hierarchy.locate(block, TierSet::Memory) {
                Some(kind @ TierKind::Dram) | Some(kind @ TierKind::Nvm) => {
                    self.copy(Some(kind), TierKind::CpuCache, block, BlockStatus::Clean, false)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Persist a block: copy it from its volatile tier into NVM (or disk when
    /// no NVM exists) as a flush write, then mark the volatile copy clean.
    pub fn bring_to_storage(&mut self, block: BlockId, status: BlockStatus) -> Result<()> {
        let source = match self.hierarchy.locate(block, TierSet::Memory) {
            Some(kind) if kind.is_volatile() => kind,
            _ => return Ok(()),
        };
        if self.hierarchy.exists(TierKind::Nvm) {
            self.copy(Some(source), TierKind::Nvm, block, status, true)?;
        } else {
            self.copy(
                Some(source),
                TierKind::Disk,
                block,
                BlockStatus::Clean,
                true,
            )?;
        }

        let refreshed = self
            .hierarchy
            .tier_mut(source)
            .cache
            .put(block, BlockStatus::Clean);
        assert!(
            refreshed.is_none(),
            "re-marking a resident block must not evict"
        );
        let ns = self.write_cost(source, block, true)?;
        self.logical_ns += u128::from(ns);
        Ok(())
    }

    pub fn read_block(&mut self, block: BlockId) -> Result<()> {
        self.bring_to_memory(block)?;
        let kind = self
            .hierarchy
            .locate(block, TierSet::Memory)
            .unwrap_or_else(|| panic!("block {block} not resident after promotion"));
        let ns = self.read_cost(kind, block)?;
        self.logical_ns += u128::from(ns);
        Ok(())
    }

    pub fn write_block(&mut self, block: BlockId) -> Result<()> {
        self.bring_to_memory(block)?;
        match self.hierarchy.locate(block, TierSet::Memory) {
            // first write to a block nobody knows: it materializes dirty in
            // the fastest tier
            None => {
                let top = self.hierarchy.top_kind();
                self.copy(None, top, block, BlockStatus::Dirty, false)
            }
            Some(kind) => {
                if kind.is_volatile() {
                    let refreshed = self
                        .hierarchy
                        .tier_mut(kind)
                        .cache
                        .put(block, BlockStatus::Dirty);
                    assert!(
                        refreshed.is_none(),
                        "re-marking a resident block must not evict"
                    );
                }
                let ns = self.write_cost(kind, block, false)?;
                self.logical_ns += u128::from(ns);
                Ok(())
            }
        }
    }

    pub fn flush_block(&mut self, block: BlockId) -> Result<()> {
        let Some(kind) = self.hierarchy.locate(block, TierSet::Memory) else {
            return Ok(());
        };
        if !kind.is_volatile() {
            return Ok(());
        }
        let status = self
            .hierarchy
            .tier_mut(kind)
            .cache
            .get(block)
            .unwrap_or_else(|| panic!("block {block} vanished from {kind} during flush"));
        if status != BlockStatus::Clean {
            self.bring_to_storage(block, status)?;
        }
        Ok(())
    }

    /// Seed a block never seen before. Once NVM runs past half full the
    /// block lands directly in the backing store; before that the regular
    /// write + flush path fills the fast tiers.
    pub fn bootstrap_block(&mut self, block: BlockId) -> Result<()> {
        if self.hierarchy.exists(TierKind::Nvm) {
            let nvm = &self.hierarchy.tier(TierKind::Nvm).cache;
            if nvm.len() * 2 > nvm.capacity() {
                let last = self.hierarchy.last_kind();
                let victim = self
                    .hierarchy
                    .tier_mut(last)
                    .cache
                    .put(block, BlockStatus::Clean);
                if let Some(victim) = victim {
                    self.move_victim(last, victim)?;
                }
                return Ok(());
            }
        }
        self.write_block(block)?;
        self.flush_block(block)
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MACHINE")?;
        for tier in self.hierarchy.tiers() {
            writeln!(f, "-------------------------------")?;
            writeln!(
                f,
                "[{}] [{}] [{}] OCCUPIED: {} %",
                tier.kind,
                tier.cache.policy_kind(),
                format_capacity(tier.cache.capacity()),
                tier.cache.occupied_percent(),
            )?;
        }
        writeln!(f, "-------------------------------")?;
        write!(f, "{}", self.stats)
    }
}
