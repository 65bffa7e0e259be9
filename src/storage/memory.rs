//! In-memory stores for testing.
//!
//! Thread-safe implementations of `ProfileStore` and `RemoteStore` that can
//! also simulate an unavailable backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::error::{DojoError, Result};
use crate::profile::UserStats;
use crate::storage::outcome::SessionOutcome;
use crate::storage::{ProfileStore, RemoteStore};

/// In-memory profile store.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profile: RwLock<Option<UserStats>>,
    fail: AtomicBool,
}

impl MemoryProfileStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a profile.
    pub fn with_profile(stats: UserStats) -> Self {
        Self {
            profile: RwLock::new(Some(stats)),
            fail: AtomicBool::new(false),
        }
    }

    /// Make every subsequent operation fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    /// The stored profile, bypassing failure simulation.
    pub fn snapshot(&self) -> Option<UserStats> {
        self.profile.read().unwrap().clone()
    }

    fn check(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(DojoError::storage(
                "memory",
                std::io::Error::other("simulated storage failure"),
            ))
        } else {
            Ok(())
        }
    }
}

impl ProfileStore for MemoryProfileStore {
    fn read(&self) -> Result<Option<UserStats>> {
        self.check()?;
        Ok(self.profile.read().unwrap().clone())
    }

    fn write(&self, stats: &UserStats) -> Result<()> {
        self.check()?;
        *self.profile.write().unwrap() = Some(stats.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.check()?;
        *self.profile.write().unwrap() = None;
        Ok(())
    }
}

/// In-memory remote store.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    documents: RwLock<HashMap<String, UserStats>>,
    outcomes: RwLock<HashMap<String, Vec<SessionOutcome>>>,
    offline: AtomicBool,
}

impl MemoryRemoteStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the remote being unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// The stored document for a user, bypassing offline simulation.
    pub fn document(&self, user_id: &str) -> Option<UserStats> {
        self.documents.read().unwrap().get(user_id).cloned()
    }

    /// Outcomes appended for a user.
    pub fn outcomes(&self, user_id: &str) -> Vec<SessionOutcome> {
        self.outcomes
            .read()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    fn check(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(DojoError::remote("remote store offline"))
        } else {
            Ok(())
        }
    }
}

impl RemoteStore for MemoryRemoteStore {
    fn fetch(&self, user_id: &str) -> Result<Option<UserStats>> {
        self.check()?;
        Ok(self.document(user_id))
    }

    fn store(&self, user_id: &str, stats: &UserStats) -> Result<()> {
        self.check()?;
        self.documents
            .write()
            .unwrap()
            .insert(user_id.to_string(), stats.clone());
        Ok(())
    }

    fn append_outcome(&self, user_id: &str, outcome: &SessionOutcome) -> Result<()> {
        self.check()?;
        self.outcomes
            .write()
            .unwrap()
            .entry(user_id.to_string())
            .or_default()
            .push(outcome.clone());
        Ok(())
    }
}
