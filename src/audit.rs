//! Append-only audit ledger on local disk.
//!
//! Each event is one line, `[<timestamp>] <message>`, appended to
//! `<dir>/history.log`. Before every append the current file is checked
//! against the size threshold; once it has reached it, the file is renamed to
//! `history-<timestamp>.log` (with a `-<n>` suffix if that name is taken) and a
//! fresh one is started. Files are never
//! truncated, so the full record is the union of all `history*.log` files.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info};

use crate::config::AuditConfig;
use crate::contract::AuditSink;

pub const LOG_FILE: &str = "history.log";

#[derive(Debug, Clone)]
pub struct AuditLog {
    dir: PathBuf,
    max_bytes: u64,
}

impl AuditLog {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(config.dir.clone(), config.max_bytes)
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn rotate_if_needed(&self, path: &Path) -> std::io::Result<()> {
        let size = match fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        if size < self.max_bytes {
            return Ok(());
        }
        let stamp = Utc::now()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace([':', '.'], "-");
        let rotated = self.rotation_target(&stamp);
        fs::rename(path, &rotated)?;
        info!(from = %path.display(), to = %rotated.display(), size, "Rotated audit log");
        Ok(())
    }

    /// First free `history-<stamp>[-<n>].log`; rotations within one millisecond
    /// must not overwrite each other.
    fn rotation_target(&self, stamp: &str) -> PathBuf {
        let mut target = self.dir.join(format!("history-{stamp}.log"));
        let mut n = 1u32;
        while target.exists() {
            target = self.dir.join(format!("history-{stamp}-{n}.log"));
            n += 1;
        }
        target
    }
}

impl AuditSink for AuditLog {
    fn append(&self, message: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path();
        self.rotate_if_needed(&path)?;

        let line = format!(
            "[{}] {message}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
        );
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(line.as_bytes())?;
        debug!(path = %path.display(), "Appended audit entry");
        Ok(())
    }
}
