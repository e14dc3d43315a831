//! Cache key derivation
//!
//! Two strategies select the patch record for an invocation:
//! - [`WorkingDirKey`]: one fixed record file per working directory
//! - [`NamedKey`]: one record per user-supplied key, hashed into the per-user cache directory
//!
//! Exactly one strategy is wired into each binary.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::PROGRAM;

/// File name of the per-directory patch record
pub const RECORD_FILE_NAME: &str = ".vi-pipe.diff";

/// Location of a persisted patch record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    path: PathBuf,
}

impl CacheKey {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CacheKey { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Strategy producing the cache key for one invocation
pub trait KeyDerivation {
    fn derive(&self) -> Result<CacheKey>;
}

/// Every invocation from the same directory shares one record, regardless of input
#[derive(Debug, Clone)]
pub struct WorkingDirKey {
    dir: PathBuf,
}

impl WorkingDirKey {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        WorkingDirKey { dir: dir.into() }
    }
}

impl KeyDerivation for WorkingDirKey {
    fn derive(&self) -> Result<CacheKey> {
        Ok(CacheKey::new(self.dir.join(RECORD_FILE_NAME)))
    }
}

/// A user-chosen key string, stored as `<program>.<sha256 hex>` in a cache directory
#[derive(Debug, Clone)]
pub struct NamedKey {
    name: String,
    cache_dir: PathBuf,
}

impl NamedKey {
    pub fn new(name: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Self {
        NamedKey {
            name: name.into(),
            cache_dir: cache_dir.into(),
        }
    }

    /// Key stored under the platform's per-user cache directory
    pub fn in_user_cache(name: impl Into<String>) -> Result<Self> {
        let Some(cache_dir) = dirs::cache_dir() else {
            anyhow::bail!("no per-user cache directory on this platform");
        };
        Ok(NamedKey::new(name, cache_dir))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl KeyDerivation for NamedKey {
    fn derive(&self) -> Result<CacheKey> {
        std::fs::create_dir_all(&self.cache_dir).with_context(|| {
            format!("failed to create cache directory: {}", self.cache_dir.display())
        })?;
        let file_name = format!("{}.{}", PROGRAM, sha256_hex(&self.name));
        Ok(CacheKey::new(self.cache_dir.join(file_name)))
    }
}

/// Lowercase hex SHA-256 of `data`
pub fn sha256_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}
