//! Run configuration: hierarchy composition, policy selection, latency
//! presets and workload knobs.

use std::{fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which tiers make up the hierarchy. A CPU cache tier is always placed on
/// top of the named tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HierarchyKind {
    #[serde(rename = "NVM")]
    Nvm,
    #[serde(rename = "DRAM-NVM")]
    DramNvm,
    #[serde(rename = "DRAM-DISK")]
    DramDisk,
    #[serde(rename = "NVM-DISK")]
    NvmDisk,
    #[serde(rename = "DRAM-NVM-DISK")]
    DramNvmDisk,
}

impl fmt::Display for HierarchyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HierarchyKind::Nvm => "NVM",
            HierarchyKind::DramNvm => "DRAM-NVM",
            HierarchyKind::DramDisk => "DRAM-DISK",
            HierarchyKind::NvmDisk => "NVM-DISK",
            HierarchyKind::DramNvmDisk => "DRAM-NVM-DISK",
        };
        f.write_str(name)
    }
}

impl FromStr for HierarchyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "NVM" => Ok(HierarchyKind::Nvm),
            "DRAM-NVM" => Ok(HierarchyKind::DramNvm),
            "DRAM-DISK" => Ok(HierarchyKind::DramDisk),
            "NVM-DISK" => Ok(HierarchyKind::NvmDisk),
            "DRAM-NVM-DISK" => Ok(HierarchyKind::DramNvmDisk),
            _ => Err(Error::Config {
                knob: "hierarchy",
                value: s.into(),
            }),
        }
    }
}

/// Latency profile of the disk tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiskMode {
    Ssd,
    Hdd,
}

impl fmt::Display for DiskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiskMode::Ssd => "SSD",
            DiskMode::Hdd => "HDD",
        })
    }
}

impl FromStr for DiskMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SSD" => Ok(DiskMode::Ssd),
            "HDD" => Ok(DiskMode::Hdd),
            _ => Err(Error::Config {
                knob: "disk mode",
                value: s.into(),
            }),
        }
    }
}

/// Eviction policy used by every tier cache below the CPU cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyKind {
    Fifo,
    Lru,
    Lfu,
    Arc,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PolicyKind::Fifo => "FIFO",
            PolicyKind::Lru => "LRU",
            PolicyKind::Lfu => "LFU",
            PolicyKind::Arc => "ARC",
        })
    }
}

impl FromStr for PolicyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "FIFO" => Ok(PolicyKind::Fifo),
            "LRU" => Ok(PolicyKind::Lru),
            "LFU" => Ok(PolicyKind::Lfu),
            "ARC" => Ok(PolicyKind::Arc),
            _ => Err(Error::Config {
                knob: "caching policy",
                value: s.into(),
            }),
        }
    }
}

/// DRAM capacity selector: class `n` gives `4096 << (n - 1)` blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SizeClass(u8);

impl SizeClass {
    pub fn blocks(self) -> usize {
        4096 << (self.0 - 1)
    }
}

impl TryFrom<u8> for SizeClass {
    type Error = Error;

    fn try_from(class: u8) -> Result<Self> {
        if (1..=4).contains(&class) {
            Ok(SizeClass(class))
        } else {
            Err(Error::Config {
                knob: "size class",
                value: class.to_string(),
            })
        }
    }
}

impl From<SizeClass> for u8 {
    fn from(class: SizeClass) -> u8 {
        class.0
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SizeClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let class: u8 = s.parse().map_err(|_| Error::Config {
            knob: "size class",
            value: s.into(),
        })?;
        SizeClass::try_from(class)
    }
}

/// NVM-to-DRAM capacity ratio selector: class `n` gives `32 << (n - 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RatioClass(u8);

impl RatioClass {
    pub fn ratio(self) -> usize {
        32 << (self.0 - 1)
    }
}

impl TryFrom<u8> for RatioClass {
    type Error = Error;

    fn try_from(class: u8) -> Result<Self> {
        if (1..=4).contains(&class) {
            Ok(RatioClass(class))
        } else {
            Err(Error::Config {
                knob: "size ratio class",
                value: class.to_string(),
            })
        }
    }
}

impl From<RatioClass> for u8 {
    fn from(class: RatioClass) -> u8 {
        class.0
    }
}

impl fmt::Display for RatioClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RatioClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let class: u8 = s.parse().map_err(|_| Error::Config {
            knob: "size ratio class",
            value: s.into(),
        })?;
        RatioClass::try_from(class)
    }
}

/// Preset NVM cost multipliers relative to the DRAM baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct NvmLatencyClass(u8);

const NVM_LATENCY_FACTORS: [(u64, u64); 8] = [
    (1, 1),
    (2, 2),
    (2, 4),
    (2, 8),
    (4, 4),
    (4, 8),
    (10, 20),
    (20, 40),
];

impl NvmLatencyClass {
    /// `(read, write)` multipliers applied to the DRAM access cost.
    pub fn factors(self) -> (u64, u64) {
        NVM_LATENCY_FACTORS[self.0 as usize - 1]
    }
}

impl TryFrom<u8> for NvmLatencyClass {
    type Error = Error;

    fn try_from(class: u8) -> Result<Self> {
        if (1..=8).contains(&class) {
            Ok(NvmLatencyClass(class))
        } else {
            Err(Error::Config {
                knob: "nvm latency class",
                value: class.to_string(),
            })
        }
    }
}

impl From<NvmLatencyClass> for u8 {
    fn from(class: NvmLatencyClass) -> u8 {
        class.0
    }
}

impl fmt::Display for NvmLatencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (read, write) = self.factors();
        write!(f, "{} (r x{read}, w x{write})", self.0)
    }
}

impl FromStr for NvmLatencyClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let class: u8 = s.parse().map_err(|_| Error::Config {
            knob: "nvm latency class",
            value: s.into(),
        })?;
        NvmLatencyClass::try_from(class)
    }
}

/// A fully resolved run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub hierarchy: HierarchyKind,
    pub disk: DiskMode,
    pub policy: PolicyKind,
    pub size_class: SizeClass,
    pub ratio_class: RatioClass,
    pub nvm_latency: NvmLatencyClass,
    /// NVM hits promote their block into DRAM with probability
    /// `1 / migration_frequency`.
    pub migration_frequency: u64,
    /// Number of measured operations; 0 replays the whole trace.
    pub operation_count: usize,
    pub trace_file: PathBuf,
    pub summary_file: PathBuf,
    pub emulate: bool,
    pub large_file_mode: bool,
    pub emulation_dir: PathBuf,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            hierarchy: HierarchyKind::DramNvmDisk,
            disk: DiskMode::Ssd,
            policy: PolicyKind::Fifo,
            size_class: SizeClass(1),
            ratio_class: RatioClass(1),
            nvm_latency: NvmLatencyClass(5),
            migration_frequency: 3,
            operation_count: 0,
            trace_file: PathBuf::new(),
            summary_file: PathBuf::from("tiersim.summary"),
            emulate: false,
            large_file_mode: false,
            emulation_dir: PathBuf::from("emulation"),
            seed: 42,
        }
    }
}

impl SimConfig {
    /// Operations dispatched before measurement starts: one tenth of the
    /// measured budget.
    pub fn warm_up_count(&self) -> usize {
        self.operation_count / 10
    }

    /// Extract a configuration from the given figment, with
    /// `TIERSIM_`-prefixed environment variables taking precedence.
    #[cfg(feature = "figment_config")]
    pub fn from_figment(figment: figment::Figment) -> Result<Self> {
        let config = figment
            .merge(figment::providers::Env::prefixed("TIERSIM_"))
            .extract()?;
        Ok(config)
    }
}
