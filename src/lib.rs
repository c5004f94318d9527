//! Block-level simulation of multi-tier storage/memory hierarchies.
//!
//! A [Machine](machine::Machine) holds an ordered list of tiers (CPU cache,
//! DRAM, NVM, disk), each backed by a bounded eviction-policy cache. Block
//! operations promote blocks toward the fast end of the hierarchy, cascade
//! evicted victims toward the slow end and accumulate a modeled latency per
//! physical access. The [Driver](driver::Driver) replays a block-level trace
//! against the machine and reports logical time, physical time and
//! throughput.
//!
//! ```
//! use tiersim::config::PolicyKind;
//! use tiersim::policy::{BlockStatus, CachePolicy, Policy};
//!
//! let mut cache = Policy::new(PolicyKind::Lru, 2);
//! assert!(cache.put(1, BlockStatus::Clean).is_none());
//! assert!(cache.put(2, BlockStatus::Clean).is_none());
//! let victim = cache.put(3, BlockStatus::Clean).expect("cache is full");
//! assert_eq!(victim.block, 1);
//! ```
//!
//! No block payloads are stored and no concurrency is involved; a run is a
//! deterministic fold over its operation stream. Runs wishing to proceed in
//! parallel must each own a fresh [Machine](machine::Machine).

pub mod cache;
pub mod config;
pub mod driver;
pub mod emulation;
pub mod error;
pub mod hierarchy;
pub mod latency;
pub mod machine;
pub mod policy;
pub mod stats;
pub mod trace;
pub mod workload;

pub use crate::{
    config::SimConfig,
    driver::{Driver, RunSummary},
    error::{Error, Result},
    machine::Machine,
};

/// Size of one logical block in bytes.
pub const BLOCK_SIZE: usize = 4096;

/// Initialize a default `env_logger` for binaries which do not set up their
/// own logging. Repeated calls are harmless.
#[cfg(feature = "init_env_logger")]
pub fn init_env_logger() {
    let _ = env_logger::builder().try_init();
}
