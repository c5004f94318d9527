//! Replays a trace against a [Machine] in three phases: preprocess (profile
//! the workload and seed the backing store), warm-up, and measurement.

use std::fs;

use log::info;
use serde::Serialize;

use crate::config::SimConfig;
use crate::error::Result;
use crate::machine::Machine;
use crate::trace::{OpKind, TraceReader};
use crate::workload::WorkloadProfile;

#[derive(Debug)]
pub struct Driver {
    config: SimConfig,
    machine: Machine,
}

/// Outcome of a measured run.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub operations: usize,
    pub reads: usize,
    pub writes: usize,
    pub flushes: usize,
    pub invalid: usize,
    pub logical_seconds: f64,
    pub physical_seconds: f64,
    /// Operations per logical second.
    pub throughput: f64,
    #[serde(skip)]
    pub profile: WorkloadProfile,
}

impl Driver {
    pub fn new(config: SimConfig) -> Result<Self> {
        #[cfg(feature = "init_env_logger")]
        crate::init_env_logger();
        let machine = Machine::from_config(&config)?;
        Ok(Driver { config, machine })
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn run(&mut self) -> Result<RunSummary> {
        let warm_up = self.config.warm_up_count();
        let cap = self.config.operation_count;
        let preprocess_budget = if cap == 0 { usize::MAX } else { cap + warm_up };

        // Preprocess: profile the workload and seed every block the run will
        // touch.
        info!("preprocessing {}", self.config.trace_file.display());
        let mut profile = WorkloadProfile::default();
        let mut reader = TraceReader::open(&self.config.trace_file)?;
        let mut seen = 0;
        for op in &mut reader {
            let op = op?;
            if profile.record(op.block) {
                self.machine.bootstrap_block(op.block)?;
            }
            seen += 1;
            if seen >= preprocess_budget {
                break;
            }
        }
        self.machine.reset_measurement();

        info!("replaying with a warm-up of {warm_up} ops");
        let mut reader = TraceReader::open(&self.config.trace_file)?;
        let mut warmed_up = warm_up == 0;
        let mut completed = 0;
        let (mut reads, mut writes, mut flushes) = (0, 0, 0);
        for op in &mut reader {
            let op = op?;
            match op.kind {
                OpKind::Read => {
                    self.machine.read_block(op.block)?;
                    reads += 1;
                }
                OpKind::Write => {
                    self.machine.write_block(op.block)?;
                    writes += 1;
                }
                OpKind::Flush => {
                    self.machine.flush_block(op.block)?;
                    flushes += 1;
                }
            }
            completed += 1;

            if !warmed_up && completed == warm_up {
                info!("warmed up after {warm_up} ops");
                self.machine.reset_measurement();
                completed = 0;
                reads = 0;
                writes = 0;
                flushes = 0;
                warmed_up = true;
                continue;
            }
            if completed % 100_000 == 0 {
                info!(
                    "operation {completed} :: block {} :: {:.2} s logical, {:.2} s physical",
                    op.block,
                    self.machine.logical_seconds(),
                    self.machine.physical.elapsed().as_secs_f64(),
                );
            }
            if cap != 0 && warmed_up && completed >= cap {
                break;
            }
        }

        let logical_seconds = self.machine.logical_seconds();
        let physical_seconds = self.machine.physical.elapsed().as_secs_f64();
        let throughput = if logical_seconds > 0.0 {
            completed as f64 / logical_seconds
        } else {
            0.0
        };
        fs::write(&self.config.summary_file, format!("{throughput:.2}\n"))?;

        Ok(RunSummary {
            operations: completed,
            reads,
            writes,
            flushes,
            invalid: reader.invalid_count(),
            logical_seconds,
            physical_seconds,
            throughput,
            profile,
        })
    }
}
