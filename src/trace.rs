//! Line-oriented trace input: one operation per line, `<op> <fork> <block>`
//! with `<op>` one of `r`, `w`, `f`.

use std::{
    fs::File,
    io::{BufRead, BufReader, Lines},
    path::Path,
};

use crate::error::Result;
use crate::policy::BlockId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Read,
    Write,
    Flush,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub kind: OpKind,
    pub block: BlockId,
}

/// Fold a per-fork block number into a globally unique block id.
pub fn global_block(fork: u64, block: u64) -> BlockId {
    fork * 10 + block
}

/// Streaming reader over a trace file. Lines that do not parse are counted
/// as invalid and skipped; they never abort a run.
#[derive(Debug)]
pub struct TraceReader {
    lines: Lines<BufReader<File>>,
    invalid: usize,
}

impl TraceReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(TraceReader {
            lines: BufReader::new(file).lines(),
            invalid: 0,
        })
    }

    /// Number of malformed lines skipped so far.
    pub fn invalid_count(&self) -> usize {
        self.invalid
    }
}

impl Iterator for TraceReader {
    type Item = Result<Operation>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(error) => return Some(Err(error.into())),
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(&line) {
                Some(op) => return Some(Ok(op)),
                None => self.invalid += 1,
            }
        }
    }
}

fn parse_line(line: &str) -> Option<Operation> {
    let mut fields = line.split_whitespace();
    let kind = match fields.next()? {
        "r" => OpKind::Read,
        "w" => OpKind::Write,
        "f" => OpKind::Flush,
        _ => return None,
    };
    let fork: u64 = fields.next()?.parse().ok()?;
    let block: u64 = fields.next()?.parse().ok()?;
    Some(Operation {
        kind,
        block: global_block(fork, block),
    })
}
