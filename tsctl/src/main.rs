//! Command line front-end for the tiered-storage simulator: replay traces,
//! generate synthetic ones.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    str::FromStr,
};

use anyhow::{anyhow, bail, Context};
use chrono::Local;
use figment::{
    providers::{Format, Json, Yaml},
    Figment,
};
use log::info;
use rand::{distributions::Distribution, Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use structopt::StructOpt;

use tiersim::config::{
    DiskMode, HierarchyKind, NvmLatencyClass, PolicyKind, RatioClass, SimConfig, SizeClass,
};
use tiersim::Driver;

#[derive(Debug, StructOpt)]
#[structopt(name = "tsctl", about = "Drive the tiered-storage simulator")]
enum Opt {
    /// Replay a trace against a simulated hierarchy
    Run(RunOpt),
    /// Generate a synthetic trace
    Generate(GenerateOpt),
}

#[derive(Debug, StructOpt)]
struct RunOpt {
    /// Configuration file (json or yaml); replaces all other knobs
    #[structopt(long)]
    config: Option<PathBuf>,
    /// Tier composition (a CPU cache always sits on top)
    #[structopt(short = "a", long, default_value = "DRAM-NVM-DISK")]
    hierarchy: HierarchyKind,
    /// Eviction policy at every tier
    #[structopt(short = "c", long, default_value = "FIFO")]
    policy: PolicyKind,
    /// Disk latency profile
    #[structopt(short = "d", long, default_value = "SSD")]
    disk: DiskMode,
    /// DRAM size class 1..4 (4096 << (n-1) blocks)
    #[structopt(short = "s", long, default_value = "1")]
    size_class: SizeClass,
    /// NVM:DRAM ratio class 1..4 (32 << (n-1))
    #[structopt(short = "z", long, default_value = "1")]
    ratio_class: RatioClass,
    /// NVM latency class 1..8
    #[structopt(short = "n", long, default_value = "5")]
    nvm_latency: NvmLatencyClass,
    /// NVM hits promote to DRAM with probability 1/N
    #[structopt(short = "m", long, default_value = "3")]
    migration_frequency: u64,
    /// Measured operations, 0 for the whole trace
    #[structopt(short = "o", long, default_value = "0")]
    operation_count: usize,
    /// Trace file to replay
    #[structopt(short = "f", long)]
    trace: Option<PathBuf>,
    /// File receiving the throughput figure
    #[structopt(short = "y", long, default_value = "tiersim.summary")]
    summary: PathBuf,
    /// Mirror device accesses onto pre-sized files
    #[structopt(long)]
    emulate: bool,
    /// Use 8/32 GiB emulation files instead of 1 GiB
    #[structopt(long)]
    large_file_mode: bool,
    /// Directory for the emulation files
    #[structopt(long, default_value = "emulation")]
    emulation_dir: PathBuf,
    /// RNG seed for migration and sync sampling
    #[structopt(long, default_value = "42")]
    seed: u64,
    /// Print the run summary as json
    #[structopt(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy)]
enum DistributionKind {
    Zipf,
    Uniform,
}

impl FromStr for DistributionKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "zipf" => Ok(DistributionKind::Zipf),
            "uniform" => Ok(DistributionKind::Uniform),
            other => Err(anyhow!("unknown distribution `{other}`")),
        }
    }
}

#[derive(Debug, StructOpt)]
struct GenerateOpt {
    /// Block distribution: zipf or uniform
    #[structopt(long, default_value = "zipf")]
    distribution: DistributionKind,
    /// Zipf exponent
    #[structopt(long, default_value = "0.99")]
    exponent: f64,
    /// Number of distinct blocks
    #[structopt(long, default_value = "100000")]
    blocks: usize,
    /// Number of operations to emit
    #[structopt(long, default_value = "1000000")]
    operations: usize,
    /// Fraction of reads
    #[structopt(long, default_value = "0.6")]
    read_fraction: f64,
    /// Fraction of flushes; the remainder are writes
    #[structopt(long, default_value = "0.1")]
    flush_fraction: f64,
    #[structopt(long, default_value = "42")]
    seed: u64,
    /// Output trace file
    #[structopt(short = "O", long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tiersim::init_env_logger();
    match Opt::from_args() {
        Opt::Run(opt) => run(opt),
        Opt::Generate(opt) => generate(opt),
    }
}

fn load_config(opt: &RunOpt) -> anyhow::Result<SimConfig> {
    if let Some(path) = &opt.config {
        let figment = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Figment::from(Yaml::file(path)),
            _ => Figment::from(Json::file(path)),
        };
        return Ok(SimConfig::from_figment(figment)?);
    }
    let trace = opt
        .trace
        .clone()
        .ok_or_else(|| anyhow!("--trace is required unless --config is given"))?;
    Ok(SimConfig {
        hierarchy: opt.hierarchy,
        disk: opt.disk,
        policy: opt.policy,
        size_class: opt.size_class,
        ratio_class: opt.ratio_class,
        nvm_latency: opt.nvm_latency,
        migration_frequency: opt.migration_frequency,
        operation_count: opt.operation_count,
        trace_file: trace,
        summary_file: opt.summary.clone(),
        emulate: opt.emulate,
        large_file_mode: opt.large_file_mode,
        emulation_dir: opt.emulation_dir.clone(),
        seed: opt.seed,
    })
}

fn print_header(config: &SimConfig) {
    println!("//{:=^74}//", "");
    println!("//{: ^74}//", "TIERED STORAGE SIMULATOR");
    println!("//{:=^74}//", "");
    println!("{:>30} : {}", "started", Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!("{:>30} : {}", "hierarchy", config.hierarchy);
    println!("{:>30} : {}", "caching policy", config.policy);
    println!("{:>30} : {}", "disk mode", config.disk);
    println!("{:>30} : {}", "size class", config.size_class);
    println!("{:>30} : {}", "size ratio class", config.ratio_class);
    println!("{:>30} : {}", "nvm latency class", config.nvm_latency);
    println!("{:>30} : {}", "migration frequency", config.migration_frequency);
    println!("{:>30} : {}", "operation count", config.operation_count);
    println!("{:>30} : {}", "trace", config.trace_file.display());
    println!("{:>30} : {}", "summary", config.summary_file.display());
    println!("{:>30} : {}", "emulate", config.emulate);
    println!("//{:=^74}//", "");
}

fn run(opt: RunOpt) -> anyhow::Result<()> {
    let config = load_config(&opt)?;
    if config.trace_file.as_os_str().is_empty() {
        bail!("configuration names no trace file");
    }
    print_header(&config);

    let mut driver = Driver::new(config).context("building the simulated machine")?;
    let summary = driver.run().context("replaying the trace")?;

    if opt.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", summary.profile);
    println!("{}", driver.machine());
    println!("+++++++++++++++++++++++++++++++++++++++++++++++++++++");
    println!("PHYSICAL TIME (s): {:.2}", summary.physical_seconds);
    println!("LOGICAL TIME  (s): {:.2}", summary.logical_seconds);
    println!("THROUGHPUT : {:.2} (OPS/S)", summary.throughput);
    println!("+++++++++++++++++++++++++++++++++++++++++++++++++++++");
    println!("Machine size : {}", driver.machine().total_resident());
    println!("Invalid operation count : {}", summary.invalid);
    if summary.operations > 0 {
        println!("READS   : {} %", summary.reads * 100 / summary.operations);
        println!("WRITES  : {} %", summary.writes * 100 / summary.operations);
        println!("FLUSHES : {} %", summary.flushes * 100 / summary.operations);
    }
    Ok(())
}

fn generate(opt: GenerateOpt) -> anyhow::Result<()> {
    if !(0.0..=1.0).contains(&opt.read_fraction)
        || !(0.0..=1.0).contains(&opt.flush_fraction)
        || opt.read_fraction + opt.flush_fraction > 1.0
    {
        bail!("read and flush fractions must lie in [0, 1] and sum to at most 1");
    }
    let mut rng = Xoshiro256Plus::seed_from_u64(opt.seed);
    let zipf = zipf::ZipfDistribution::new(opt.blocks, opt.exponent)
        .map_err(|()| anyhow!("invalid zipf parameters"))?;

    let file = File::create(&opt.out)?;
    let mut out = BufWriter::new(file);
    for _ in 0..opt.operations {
        let block = match opt.distribution {
            DistributionKind::Zipf => zipf.sample(&mut rng),
            DistributionKind::Uniform => rng.gen_range(1..=opt.blocks),
        };
        let share: f64 = rng.gen();
        let op = if share < opt.read_fraction {
            'r'
        } else if share < opt.read_fraction + opt.flush_fraction {
            'f'
        } else {
            'w'
        };
        writeln!(out, "{op} 0 {block}")?;
    }
    out.flush()?;
    info!(
        "wrote {} operations over {} blocks to {}",
        opt.operations,
        opt.blocks,
        opt.out.display()
    );
    Ok(())
}
