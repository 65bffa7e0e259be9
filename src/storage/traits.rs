//! Storage traits for ear-dojo.
//!
//! `ProfileStore` is the local key-value slot holding the serialized
//! profile. `RemoteStore` is the per-user document store plus the
//! append-only outcome log.

use std::sync::Arc;

use crate::error::Result;
use crate::profile::UserStats;
use crate::storage::outcome::SessionOutcome;

/// Local persistence for the learner profile.
pub trait ProfileStore: Send + Sync {
    /// Read the stored profile.
    ///
    /// Returns `Ok(None)` if nothing has been stored yet.
    fn read(&self) -> Result<Option<UserStats>>;

    /// Overwrite the stored profile wholesale.
    fn write(&self, stats: &UserStats) -> Result<()>;

    /// Remove the stored profile.
    ///
    /// Returns `Ok(())` even if nothing was stored.
    fn clear(&self) -> Result<()>;
}

/// Remote document store keyed by user id.
pub trait RemoteStore: Send + Sync {
    /// Fetch the remote profile for a user.
    ///
    /// Returns `Ok(None)` if the user has no remote profile.
    fn fetch(&self, user_id: &str) -> Result<Option<UserStats>>;

    /// Store (set-with-merge) the profile document for a user.
    fn store(&self, user_id: &str, stats: &UserStats) -> Result<()>;

    /// Append a session outcome to the user's log.
    fn append_outcome(&self, user_id: &str, outcome: &SessionOutcome) -> Result<()>;
}

/// Source of a stable user id once the learner has signed in.
pub trait IdentityProvider {
    /// The signed-in user's id, or `None` when signed out.
    fn user_id(&self) -> Option<String>;
}

/// An identity fixed at construction time (from config or CLI flags).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticIdentity(pub Option<String>);

impl StaticIdentity {
    /// A signed-in identity.
    pub fn user(id: impl Into<String>) -> Self {
        Self(Some(id.into()))
    }

    /// A signed-out identity.
    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn user_id(&self) -> Option<String> {
        self.0.clone().filter(|id| !id.trim().is_empty())
    }
}

impl<T: ProfileStore + ?Sized> ProfileStore for Arc<T> {
    fn read(&self) -> Result<Option<UserStats>> {
        (**self).read()
    }

    fn write(&self, stats: &UserStats) -> Result<()> {
        (**self).write(stats)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

impl<T: RemoteStore + ?Sized> RemoteStore for Arc<T> {
    fn fetch(&self, user_id: &str) -> Result<Option<UserStats>> {
        (**self).fetch(user_id)
    }

    fn store(&self, user_id: &str, stats: &UserStats) -> Result<()> {
        (**self).store(user_id, stats)
    }

    fn append_outcome(&self, user_id: &str, outcome: &SessionOutcome) -> Result<()> {
        (**self).append_outcome(user_id, outcome)
    }
}
