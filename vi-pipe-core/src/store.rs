//! Patch record persistence
//!
//! Global invariants enforced:
//! - Opening a record never truncates it; existing content stays readable
//! - After `overwrite`, the record holds exactly the new patch text
//! - Record files are private to the user (mode 0600 on Unix)
//! - I/O failures are returned to the caller, never retried or repaired

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::key::CacheKey;

/// Last modification time of the record at `key`, or `None` if it does not exist yet
pub fn last_modified(key: &CacheKey) -> Result<Option<SystemTime>> {
    match std::fs::metadata(key.path()) {
        Ok(meta) => {
            let modified = meta
                .modified()
                .with_context(|| format!("failed to read mtime of {}", key))?;
            Ok(Some(modified))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to stat diff file: {}", key)),
    }
}

/// An open, read/write handle on one patch record
#[derive(Debug)]
pub struct PatchRecord {
    path: PathBuf,
    file: File,
}

impl PatchRecord {
    /// Open the record at `key`, creating an empty one if absent
    pub fn open(key: &CacheKey) -> Result<Self> {
        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true).truncate(false);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let file = options
            .open(key.path())
            .with_context(|| format!("failed to open diff file: {}", key))?;

        Ok(PatchRecord {
            path: key.path().to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full current content of the record; empty for a freshly created one
    ///
    /// Bytes that are not valid UTF-8 are replaced rather than rejected; the
    /// patch codec treats the result as an unreadable patch.
    pub fn read(&mut self) -> Result<String> {
        self.file
            .seek(SeekFrom::Start(0))
            .with_context(|| format!("failed to seek diff file: {}", self.path.display()))?;
        let mut bytes = Vec::new();
        self.file
            .read_to_end(&mut bytes)
            .with_context(|| format!("failed to read diff file: {}", self.path.display()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Replace the record's entire content with `patch`
    pub fn overwrite(&mut self, patch: &str) -> Result<()> {
        self.file
            .set_len(0)
            .with_context(|| format!("failed to truncate diff file: {}", self.path.display()))?;
        self.file
            .seek(SeekFrom::Start(0))
            .with_context(|| format!("failed to seek diff file: {}", self.path.display()))?;
        self.file
            .write_all(patch.as_bytes())
            .with_context(|| format!("failed to write diff file: {}", self.path.display()))?;
        self.file
            .sync_data()
            .with_context(|| format!("failed to sync diff file: {}", self.path.display()))
    }
}
