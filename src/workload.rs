//! Access-frequency profile of a trace, collected during the preprocess pass
//! and rendered as part of the run report.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashMap;

use crate::hierarchy::format_capacity;
use crate::policy::BlockId;

const COVERAGE_STEPS: [u64; 6] = [10, 25, 50, 75, 90, 100];
const CAPACITY_LADDER: [usize; 7] = [1, 16, 256, 4096, 16384, 65536, 1_048_576];

/// Per-block access counts of one trace.
#[derive(Debug, Default)]
pub struct WorkloadProfile {
    frequency: FxHashMap<BlockId, u64>,
    total: u64,
}

impl WorkloadProfile {
    /// Count one access; returns true on the first sight of `block`.
    pub fn record(&mut self, block: BlockId) -> bool {
        self.total += 1;
        let count = self.frequency.entry(block).or_insert(0);
        *count += 1;
        *count == 1
    }

    pub fn distinct_blocks(&self) -> usize {
        self.frequency.len()
    }

    pub fn total_accesses(&self) -> u64 {
        self.total
    }

    /// Histogram of access counts: frequency -> number of blocks with it.
    fn histogram(&self) -> BTreeMap<u64, u64> {
        let mut histogram = BTreeMap::new();
        for &count in self.frequency.values() {
            *histogram.entry(count).or_insert(0u64) += 1;
        }
        histogram
    }

    /// Blocks needed, hottest first, to cover `percent` of all accesses.
    pub fn blocks_for_coverage(&self, percent: u64) -> usize {
        let required = self.total * percent / 100;
        let mut covered = 0;
        let mut blocks = 0;
        for (&frequency, &count) in self.histogram().iter().rev() {
            covered += frequency * count;
            blocks += count as usize;
            if covered > required {
                break;
            }
        }
        blocks
    }

    /// Share of all accesses captured by a cache holding the `capacity`
    /// hottest blocks.
    pub fn captured_percent(&self, capacity: usize) -> u64 {
        if self.total == 0 {
            return 0;
        }
        let mut captured = 0;
        let mut remaining = capacity as u64;
        for (&frequency, &count) in self.histogram().iter().rev() {
            let taken = count.min(remaining);
            captured += frequency * taken;
            remaining -= taken;
            if remaining == 0 {
                break;
            }
        }
        captured * 100 / self.total
    }
}

impl fmt::Display for WorkloadProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "WORKLOAD ANALYSIS")?;
        writeln!(
            f,
            "BLOCKS: {}  ACCESSES: {}",
            self.distinct_blocks(),
            self.total_accesses()
        )?;
        for percent in COVERAGE_STEPS {
            writeln!(
                f,
                "PERCENT: {percent:>3} BLOCKS NEEDED: {}",
                format_capacity(self.blocks_for_coverage(percent))
            )?;
        }
        for capacity in CAPACITY_LADDER {
            writeln!(
                f,
                "AVAILABLE BLOCKS: {:>7} PERCENT: {} %",
                format_capacity(capacity),
                self.captured_percent(capacity)
            )?;
        }
        Ok(())
    }
}
