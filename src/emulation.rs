//! Optional filesystem-backed emulation.
//!
//! The movement engine exposes a hook: every modeled device access can be
//! mirrored as a real positioned read or write against a pre-sized file, so
//! that wall-clock latency can be measured next to the modeled one. Only the
//! durable tiers are backed by files; the memory tiers stay purely modeled.

use std::{
    fmt, fs,
    io::{Read, Seek, SeekFrom, Write},
    path::Path,
    time::{Duration, Instant},
};

use log::info;

use crate::error::Result;
use crate::hierarchy::TierKind;
use crate::policy::BlockId;
use crate::BLOCK_SIZE;

const GIB: u64 = 1024 * 1024 * 1024;

/// Sink for physical block accesses.
pub trait IoBackend: fmt::Debug {
    fn read(&mut self, tier: TierKind, block: BlockId) -> std::io::Result<()>;

    /// `sync` forces the write to the device before returning.
    fn write(&mut self, tier: TierKind, block: BlockId, sync: bool) -> std::io::Result<()>;
}

/// One pre-sized file per durable tier.
#[derive(Debug)]
pub struct FileBackend {
    files: Vec<(TierKind, EmulationFile)>,
}

#[derive(Debug)]
struct EmulationFile {
    file: fs::File,
    blocks: u64,
}

impl FileBackend {
    /// Create the emulation files under `dir`. In `large_file_mode` the NVM
    /// and disk files grow to 8 and 32 GiB; otherwise each is 1 GiB.
    pub fn create(dir: &Path, tiers: &[TierKind], large_file_mode: bool) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let mut files = Vec::new();
        for &kind in tiers {
            let bytes = match (kind, large_file_mode) {
                (TierKind::Nvm, false) | (TierKind::Disk, false) => GIB,
                (TierKind::Nvm, true) => 8 * GIB,
                (TierKind::Disk, true) => 32 * GIB,
                _ => continue,
            };
            let path = dir.join(format!("{}.blocks", kind.to_string().to_lowercase()));
            let file = fs::OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(&path)?;
            file.set_len(bytes)?;
            info!(
                "emulating {kind} with {} ({} GiB)",
                path.display(),
                bytes / GIB
            );
            files.push((
                kind,
                EmulationFile {
                    file,
                    blocks: bytes / BLOCK_SIZE as u64,
                },
            ));
        }
        Ok(FileBackend { files })
    }

    fn file_for(&mut self, tier: TierKind) -> Option<&mut EmulationFile> {
        self.files
            .iter_mut()
            .find(|(kind, _)| *kind == tier)
            .map(|(_, file)| file)
    }
}

impl IoBackend for FileBackend {
    fn read(&mut self, tier: TierKind, block: BlockId) -> std::io::Result<()> {
        let Some(target) = self.file_for(tier) else {
            return Ok(());
        };
        let offset = (block % target.blocks) * BLOCK_SIZE as u64;
        let mut buffer = [0u8; BLOCK_SIZE];
        target.file.seek(SeekFrom::Start(offset))?;
        target.file.read_exact(&mut buffer)?;
        Ok(())
    }

    fn write(&mut self, tier: TierKind, block: BlockId, sync: bool) -> std::io::Result<()> {
        let Some(target) = self.file_for(tier) else {
            return Ok(());
        };
        let offset = (block % target.blocks) * BLOCK_SIZE as u64;
        let buffer = [0u8; BLOCK_SIZE];
        target.file.seek(SeekFrom::Start(offset))?;
        target.file.write_all(&buffer)?;
        if sync {
            target.file.sync_data()?;
        }
        Ok(())
    }
}

/// Wall-clock accumulator wrapped around emulated I/O.
#[derive(Debug, Default)]
pub struct PhysicalTimer {
    elapsed: Duration,
}

impl PhysicalTimer {
    pub fn time<T>(&mut self, operation: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = operation();
        self.elapsed += start.elapsed();
        out
    }

    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}
