//! Per-analyzer report files
//!
//! Layout: `<root>/<analyzer>/<analyzer>.log.<N>`, `N` starting at 1. A file
//! is never held open: each line is appended with a fresh open/close so the
//! files can be moved away between writes. Once the current file grows past
//! the threshold the next line starts file `N + 1`.

use crate::errors::InitError;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Default rotation threshold in bytes
pub const DEFAULT_ROTATE_BYTES: u64 = 300_722_733;

#[derive(Debug, Clone)]
pub struct RotatingLog {
    dir: PathBuf,
    name: String,
    index: u32,
    threshold: u64,
}

impl RotatingLog {
    /// Open the log directory for `name` under `root`, resuming at the
    /// highest existing file index
    pub fn open(root: &Path, name: &str, threshold: u64) -> Result<Self, InitError> {
        let dir = root.join(name);
        fs::create_dir_all(&dir).map_err(|e| InitError::LogRoot {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;
        let index = highest_index(&dir, name).unwrap_or(1);
        Ok(Self {
            dir,
            name: name.to_string(),
            index,
            threshold,
        })
    }

    pub fn current_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log.{}", self.name, self.index))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    /// Append one line, rotating first if the current file is over the
    /// threshold
    pub fn append(&mut self, line: &str) -> io::Result<()> {
        if let Ok(meta) = fs::metadata(self.current_path()) {
            if meta.len() > self.threshold {
                self.index += 1;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.current_path())?;
        writeln!(file, "{line}")
    }
}

/// `<txHash>,<contract>,<Label>:<message>`
pub fn format_line(tx_hash: &str, contract: &str, label: &str, message: &str) -> String {
    format!("{tx_hash},{contract},{label}:{message}")
}

fn highest_index(dir: &Path, name: &str) -> Option<u32> {
    let prefix = format!("{name}.log.");
    fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            entry
                .file_name()
                .to_str()
                .and_then(|f| f.strip_prefix(&prefix))
                .and_then(|n| n.parse::<u32>().ok())
        })
        .max()
}
