//! Directory-backed remote store.
//!
//! Stands in for a hosted document store: each user gets `<user>.json`
//! holding the profile document and `<user>.outcomes.jsonl`, an append-only
//! JSONL log of session outcomes. Pointing the directory at a synced folder
//! shares progress between machines.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{DojoError, Result};
use crate::profile::UserStats;
use crate::storage::outcome::SessionOutcome;
use crate::storage::RemoteStore;
use crate::util::{atomic_write, read_to_string_limited};

/// Remote store rooted at a directory.
#[derive(Debug, Clone)]
pub struct DirectoryRemoteStore {
    root: PathBuf,
}

impl DirectoryRemoteStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Path of a user's profile document.
    fn document_path(&self, user_id: &str) -> Result<PathBuf> {
        Ok(self.root.join(format!("{}.json", file_stem(user_id)?)))
    }

    /// Path of a user's outcome log.
    fn log_path(&self, user_id: &str) -> Result<PathBuf> {
        Ok(self.root.join(format!("{}.outcomes.jsonl", file_stem(user_id)?)))
    }
}

/// Reject ids that cannot safely name a file.
fn file_stem(user_id: &str) -> Result<&str> {
    let valid = !user_id.is_empty()
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(user_id)
    } else {
        Err(DojoError::remote(format!("invalid user id: {:?}", user_id)))
    }
}

impl RemoteStore for DirectoryRemoteStore {
    fn fetch(&self, user_id: &str) -> Result<Option<UserStats>> {
        let path = self.document_path(user_id)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = read_to_string_limited(&path)?;
        let stats: UserStats = serde_json::from_str(&content)?;
        Ok(Some(stats))
    }

    fn store(&self, user_id: &str, stats: &UserStats) -> Result<()> {
        let path = self.document_path(user_id)?;
        let json = serde_json::to_string_pretty(stats)?;
        atomic_write(&path, json.as_bytes())
    }

    fn append_outcome(&self, user_id: &str, outcome: &SessionOutcome) -> Result<()> {
        let path = self.log_path(user_id)?;

        fs::create_dir_all(&self.root).map_err(|e| {
            DojoError::remote(format!(
                "Failed to create directory {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let json = serde_json::to_string(outcome)
            .map_err(|e| DojoError::serde(format!("Failed to serialize outcome: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                DojoError::remote(format!(
                    "Failed to open outcome log {}: {}",
                    path.display(),
                    e
                ))
            })?;

        writeln!(file, "{}", json).map_err(|e| {
            DojoError::remote(format!(
                "Failed to write to outcome log {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::outcome::ModeTag;
    use crate::storage::traits::tests::test_remote_store_cycle;
    use tempfile::TempDir;

    #[test]
    fn test_directory_remote_store_cycle() {
        let dir = TempDir::new().unwrap();
        let store = DirectoryRemoteStore::new(dir.path().join("remote"));
        test_remote_store_cycle(&store);
    }

    #[test]
    fn test_append_outcome_is_jsonl() {
        let dir = TempDir::new().unwrap();
        let store = DirectoryRemoteStore::new(dir.path());

        store
            .append_outcome("learner-1", &SessionOutcome::new(ModeTag::Dojo, 40, true, None))
            .unwrap();
        store
            .append_outcome(
                "learner-1",
                &SessionOutcome::new(ModeTag::Challenge, 60, false, Some(3)),
            )
            .unwrap();

        let content = fs::read_to_string(dir.path().join("learner-1.outcomes.jsonl")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let second: SessionOutcome = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.mode, ModeTag::Challenge);
        assert_eq!(second.challenge_id, Some(3));
    }

    #[test]
    fn test_rejects_path_like_user_ids() {
        let dir = TempDir::new().unwrap();
        let store = DirectoryRemoteStore::new(dir.path());

        assert!(store.fetch("../escape").is_err());
        assert!(store.store("", &UserStats::default()).is_err());
    }
}
