//! File-based profile storage for ear-dojo.
//!
//! The profile is stored as a single JSON file, `~/.ear-dojo/profile.json`
//! by default. Writes go through temp file + rename.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::profile_path;
use crate::error::{DojoError, Result};
use crate::profile::UserStats;
use crate::storage::ProfileStore;
use crate::util::{atomic_write, read_to_string_limited};

/// File-based profile storage.
#[derive(Debug, Clone)]
pub struct FileProfileStore {
    /// Path of the profile JSON file.
    path: PathBuf,
}

impl FileProfileStore {
    /// Create a store at the default location.
    ///
    /// Uses `~/.ear-dojo/profile.json` or `$EAR_DOJO_HOME/profile.json`.
    pub fn new() -> Result<Self> {
        let path = profile_path().ok_or_else(|| {
            DojoError::config("Could not determine profile location (no home directory)")
        })?;
        Ok(Self::with_path(path))
    }

    /// Create a store backed by a specific file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the profile file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileStore for FileProfileStore {
    fn read(&self) -> Result<Option<UserStats>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = read_to_string_limited(&self.path)?;
        let stats: UserStats = serde_json::from_str(&content)?;

        Ok(Some(stats))
    }

    fn write(&self, stats: &UserStats) -> Result<()> {
        let json = serde_json::to_string_pretty(stats)?;
        atomic_write(&self.path, json.as_bytes())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| DojoError::storage(&self.path, e))?;
        }
        Ok(())
    }
}
