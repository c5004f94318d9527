//! Per-tier operation counters and the block movement matrix.

use std::fmt;

use indexmap::IndexMap;

use crate::hierarchy::TierKind;

/// Counters accumulated over one measurement phase.
#[derive(Debug, Default, Clone)]
pub struct Stats {
    read_ops: IndexMap<TierKind, u64>,
    write_ops: IndexMap<TierKind, u64>,
    flush_ops: IndexMap<TierKind, u64>,
    sync_ops: IndexMap<TierKind, u64>,
    /// Block movements keyed by `(source, destination)`; a `None` source is
    /// the creation of a fresh block.
    movement_ops: IndexMap<(Option<TierKind>, TierKind), u64>,
}

impl Stats {
    pub fn reset(&mut self) {
        self.read_ops.clear();
        self.write_ops.clear();
        self.flush_ops.clear();
        self.sync_ops.clear();
        self.movement_ops.clear();
    }

    pub fn count_read(&mut self, kind: TierKind) {
        *self.read_ops.entry(kind).or_insert(0) += 1;
    }

    pub fn count_write(&mut self, kind: TierKind) {
        *self.write_ops.entry(kind).or_insert(0) += 1;
    }

    pub fn count_flush(&mut self, kind: TierKind) {
        *self.flush_ops.entry(kind).or_insert(0) += 1;
    }

    pub fn count_sync(&mut self, kind: TierKind) {
        *self.sync_ops.entry(kind).or_insert(0) += 1;
    }

    pub fn count_movement(&mut self, source: Option<TierKind>, destination: TierKind) {
        *self.movement_ops.entry((source, destination)).or_insert(0) += 1;
    }

    pub fn reads(&self, kind: TierKind) -> u64 {
        self.read_ops.get(&kind).copied().unwrap_or(0)
    }

    pub fn writes(&self, kind: TierKind) -> u64 {
        self.write_ops.get(&kind).copied().unwrap_or(0)
    }

    pub fn flushes(&self, kind: TierKind) -> u64 {
        self.flush_ops.get(&kind).copied().unwrap_or(0)
    }

    pub fn syncs(&self, kind: TierKind) -> u64 {
        self.sync_ops.get(&kind).copied().unwrap_or(0)
    }

    pub fn movements(&self, source: Option<TierKind>, destination: TierKind) -> u64 {
        self.movement_ops
            .get(&(source, destination))
            .copied()
            .unwrap_or(0)
    }
}

fn write_counter_table(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    counters: &IndexMap<TierKind, u64>,
) -> fmt::Result {
    writeln!(f, "{title}:")?;
    for (kind, count) in counters {
        writeln!(f, "{:>10} :: {} ops", kind.to_string(), count)?;
    }
    Ok(())
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_counter_table(f, "READ OPS", &self.read_ops)?;
        write_counter_table(f, "WRITE OPS", &self.write_ops)?;
        write_counter_table(f, "FLUSH OPS", &self.flush_ops)?;
        write_counter_table(f, "SYNC OPS", &self.sync_ops)?;
        writeln!(f, "MOVEMENT OPS:")?;
        for (&(source, destination), count) in &self.movement_ops {
            let source = match source {
                Some(kind) => kind.to_string(),
                None => "NEW".to_string(),
            };
            writeln!(f, "{source:>10} ~ {destination} :: {count} ops")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_and_reset() {
        let mut stats = Stats::default();
        stats.count_read(TierKind::Dram);
        stats.count_read(TierKind::Dram);
        stats.count_write(TierKind::Nvm);
        stats.count_flush(TierKind::Nvm);
        stats.count_movement(None, TierKind::CpuCache);
        stats.count_movement(Some(TierKind::Dram), TierKind::Nvm);

        assert_eq!(stats.reads(TierKind::Dram), 2);
        assert_eq!(stats.reads(TierKind::Disk), 0);
        assert_eq!(stats.writes(TierKind::Nvm), 1);
        assert_eq!(stats.flushes(TierKind::Nvm), 1);
        assert_eq!(stats.movements(None, TierKind::CpuCache), 1);
        assert_eq!(stats.movements(Some(TierKind::Dram), TierKind::Nvm), 1);

        stats.reset();
        assert_eq!(stats.reads(TierKind::Dram), 0);
        assert_eq!(stats.movements(Some(TierKind::Dram), TierKind::Nvm), 0);
    }
}
