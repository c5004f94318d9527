//! Scenario tests for the movement engine and the trace driver.

use std::io::Write;

use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

use tiersim::config::{DiskMode, NvmLatencyClass, PolicyKind, SimConfig};
use tiersim::hierarchy::{Hierarchy, TierKind};
use tiersim::latency::LatencyModel;
use tiersim::machine::Machine;
use tiersim::policy::BlockStatus::{Clean, Dirty};
use tiersim::Driver;

fn latency() -> LatencyModel {
    LatencyModel::new(NvmLatencyClass::try_from(1).unwrap(), DiskMode::Ssd)
}

/// DRAM / NVM / disk without a CPU cache, so writes land in DRAM directly.
fn three_tier(policy: PolicyKind, dram_capacity: usize) -> Hierarchy {
    Hierarchy::new(
        policy,
        &[
            (TierKind::Dram, dram_capacity),
            (TierKind::Nvm, 100),
            (TierKind::Disk, 4096),
        ],
        &[TierKind::Dram, TierKind::Nvm],
        &[TierKind::Nvm, TierKind::Disk],
    )
}

fn dirty_blocks(machine: &Machine) -> usize {
    machine
        .hierarchy
        .tiers()
        .iter()
        .flat_map(|tier| tier.cache.entries())
        .filter(|&(_, status)| status == Dirty)
        .count()
}

#[test]
fn clean_evictions_from_dram_stay_silent() {
    let mut machine = Machine::new(three_tier(PolicyKind::Fifo, 2), latency(), 1_000_000, 42);

    machine.write_block(10).unwrap();
    machine.flush_block(10).unwrap();
    machine.write_block(11).unwrap();
    // the third write evicts the freshly flushed block 10; being clean, its
    // eviction must not touch NVM again
    machine.write_block(12).unwrap();

    assert_eq!(machine.stats.writes(TierKind::Nvm), 1);
    assert_eq!(machine.stats.flushes(TierKind::Nvm), 1);
    assert_eq!(
        machine.stats.movements(Some(TierKind::Dram), TierKind::Nvm),
        1
    );
    assert_eq!(machine.stats.movements(None, TierKind::Dram), 3);
    let mut dram = 0;
    for block in [11, 12] {
        if machine
            .hierarchy
            .tier_mut(TierKind::Dram)
            .cache
            .get(block)
            .is_some()
        {
            dram += 1;
        }
    }
    assert_eq!(dram, 2);
}

#[test]
fn dirty_evictions_from_dram_demote_to_nvm() {
    let mut machine = Machine::new(three_tier(PolicyKind::Fifo, 2), latency(), 1_000_000, 42);

    machine.write_block(10).unwrap();
    machine.write_block(11).unwrap();
    machine.write_block(12).unwrap();

    // block 10 was never flushed, so its eviction cascades
    assert_eq!(machine.stats.writes(TierKind::Nvm), 1);
    assert_eq!(
        machine.stats.movements(Some(TierKind::Dram), TierKind::Nvm),
        1
    );
    assert_eq!(
        machine.hierarchy.tier_mut(TierKind::Nvm).cache.get(10),
        Some(Dirty)
    );
}

#[test]
fn flush_places_a_clean_copy_in_the_backing_store() {
    let mut machine = Machine::new(
        Hierarchy::new(
            PolicyKind::Lru,
            &[(TierKind::Dram, 4), (TierKind::Disk, 4096)],
            &[TierKind::Dram],
            &[TierKind::Disk],
        ),
        latency(),
        1_000_000,
        42,
    );

    machine.write_block(1).unwrap();
    machine.flush_block(1).unwrap();

    assert_eq!(
        machine.hierarchy.tier_mut(TierKind::Disk).cache.get(1),
        Some(Clean)
    );
    assert_eq!(
        machine.hierarchy.tier_mut(TierKind::Dram).cache.get(1),
        Some(Clean)
    );

    // a flushed block flushes to nothing the second time
    let disk_writes = machine.stats.writes(TierKind::Disk);
    machine.flush_block(1).unwrap();
    assert_eq!(machine.stats.writes(TierKind::Disk), disk_writes);
}

#[test]
fn nvm_evictions_always_spill_to_disk() {
    let mut machine = Machine::new(three_tier(PolicyKind::Fifo, 8), latency(), 1_000_000, 42);

    // overflow the NVM tier with clean residents
    for block in 0..101 {
        machine
            .copy(None, TierKind::Nvm, block, Clean, false)
            .unwrap();
    }
    assert_eq!(
        machine.stats.movements(Some(TierKind::Nvm), TierKind::Disk),
        1
    );
    assert_eq!(
        machine.hierarchy.tier_mut(TierKind::Disk).cache.get(0),
        Some(Clean)
    );
}

#[test]
fn every_nvm_hit_migrates_when_frequency_is_one() {
    let mut machine = Machine::new(three_tier(PolicyKind::Fifo, 8), latency(), 1, 42);
    machine
        .hierarchy
        .tier_mut(TierKind::Nvm)
        .cache
        .put(5, Clean);

    machine.read_block(5).unwrap();

    assert_eq!(
        machine.hierarchy.tier_mut(TierKind::Dram).cache.get(5),
        Some(Clean)
    );
    assert_eq!(
        machine.stats.movements(Some(TierKind::Nvm), TierKind::Dram),
        1
    );
    // the read itself was served from DRAM after the promotion
    assert_eq!(machine.stats.reads(TierKind::Dram), 1);
}

#[test]
fn rare_migration_leaves_blocks_on_nvm() {
    let mut machine = Machine::new(three_tier(PolicyKind::Fifo, 8), latency(), 1_000_000, 42);
    machine
        .hierarchy
        .tier_mut(TierKind::Nvm)
        .cache
        .put(5, Clean);

    machine.read_block(5).unwrap();

    assert_eq!(machine.hierarchy.tier_mut(TierKind::Dram).cache.len(), 0);
    assert_eq!(machine.stats.reads(TierKind::Nvm), 1);
}

#[test]
fn cpu_cache_mirrors_memory_hits() {
    let mut machine = Machine::new(
        Hierarchy::new(
            PolicyKind::Lru,
            &[
                (TierKind::CpuCache, 4),
                (TierKind::Dram, 8),
                (TierKind::Disk, 4096),
            ],
            &[TierKind::CpuCache, TierKind::Dram],
            &[TierKind::Disk],
        ),
        latency(),
        1_000_000,
        42,
    );

    machine.write_block(3).unwrap();
    // a fresh block materializes in the fastest tier
    assert_eq!(
        machine.hierarchy.tier_mut(TierKind::CpuCache).cache.get(3),
        Some(Dirty)
    );

    // a block sitting in DRAM only gets mirrored upward on access
    machine.hierarchy.tier_mut(TierKind::Dram).cache.put(9, Clean);
    machine.read_block(9).unwrap();
    assert_eq!(
        machine.hierarchy.tier_mut(TierKind::CpuCache).cache.get(9),
        Some(Clean)
    );
    assert_eq!(machine.stats.reads(TierKind::CpuCache), 1);
}

#[test]
fn reads_and_flushes_never_create_dirt() {
    let mut machine = Machine::new(three_tier(PolicyKind::Lru, 4), latency(), 3, 42);
    let mut rng = XorShiftRng::seed_from_u64(99);

    for block in 0..40 {
        machine.bootstrap_block(block).unwrap();
    }
    for _ in 0..500 {
        let block = rng.gen_range(0..40u64);
        match rng.gen_range(0..4) {
            0 => {
                machine.write_block(block).unwrap();
            }
            1 => {
                let before = dirty_blocks(&machine);
                machine.flush_block(block).unwrap();
                assert!(dirty_blocks(&machine) <= before);
            }
            _ => {
                let before = dirty_blocks(&machine);
                machine.read_block(block).unwrap();
                assert!(dirty_blocks(&machine) <= before);
            }
        }
    }
}

#[test]
fn bootstrap_switches_to_the_backing_store_once_nvm_half_fills() {
    let mut machine = Machine::new(
        Hierarchy::new(
            PolicyKind::Fifo,
            &[
                (TierKind::Dram, 8),
                (TierKind::Nvm, 4),
                (TierKind::Disk, 4096),
            ],
            &[TierKind::Dram, TierKind::Nvm],
            &[TierKind::Nvm, TierKind::Disk],
        ),
        latency(),
        1_000_000,
        42,
    );

    for block in 1..=3 {
        machine.bootstrap_block(block).unwrap();
    }
    // the first three bootstraps travel the write + flush path into NVM
    assert_eq!(machine.hierarchy.tier_mut(TierKind::Nvm).cache.len(), 3);
    assert_eq!(machine.hierarchy.tier_mut(TierKind::Disk).cache.len(), 0);

    // NVM is now more than half full: block 4 goes straight to disk
    machine.bootstrap_block(4).unwrap();
    assert_eq!(
        machine.hierarchy.tier_mut(TierKind::Disk).cache.get(4),
        Some(Clean)
    );
    assert_eq!(machine.hierarchy.tier_mut(TierKind::Nvm).cache.get(4), None);
}

#[test]
fn driver_replays_a_trace_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    let trace_path = dir.path().join("trace.txt");
    let summary_path = dir.path().join("run.summary");

    let mut trace = std::fs::File::create(&trace_path).unwrap();
    writeln!(trace, "w 0 1").unwrap();
    writeln!(trace, "r 0 1").unwrap();
    writeln!(trace, "w 0 2").unwrap();
    writeln!(trace, "f 0 2").unwrap();
    writeln!(trace, "r 0 1").unwrap();
    writeln!(trace, "bogus line").unwrap();
    writeln!(trace, "x 1 1").unwrap();
    writeln!(trace, "w 0 3").unwrap();
    writeln!(trace, "r 0 3").unwrap();
    drop(trace);

    let config = SimConfig {
        policy: PolicyKind::Lru,
        trace_file: trace_path,
        summary_file: summary_path.clone(),
        operation_count: 0,
        ..SimConfig::default()
    };
    let mut driver = Driver::new(config).unwrap();
    let summary = driver.run().unwrap();

    assert_eq!(summary.operations, 7);
    assert_eq!(summary.reads, 3);
    assert_eq!(summary.writes, 3);
    assert_eq!(summary.flushes, 1);
    assert_eq!(summary.invalid, 2);
    assert_eq!(summary.profile.distinct_blocks(), 3);
    assert!(summary.throughput > 0.0);
    assert!(summary.logical_seconds > 0.0);

    let written = std::fs::read_to_string(&summary_path).unwrap();
    assert_eq!(written.trim(), format!("{:.2}", summary.throughput));
}

#[test]
fn driver_warm_up_excludes_early_operations() {
    let dir = tempfile::tempdir().unwrap();
    let trace_path = dir.path().join("trace.txt");
    let summary_path = dir.path().join("run.summary");

    let mut trace = std::fs::File::create(&trace_path).unwrap();
    for block in 0..200 {
        writeln!(trace, "w 0 {}", block % 50).unwrap();
        writeln!(trace, "r 0 {}", block % 50).unwrap();
    }
    drop(trace);

    let config = SimConfig {
        trace_file: trace_path,
        summary_file: summary_path,
        // 100 measured operations plus a warm-up of 10
        operation_count: 100,
        ..SimConfig::default()
    };
    let mut driver = Driver::new(config).unwrap();
    let summary = driver.run().unwrap();

    assert_eq!(summary.operations, 100);
    assert_eq!(summary.reads + summary.writes, 100);
}
