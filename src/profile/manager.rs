//! Profile manager: the one object that loads, saves, resets, progresses,
//! and syncs the learner profile.
//!
//! Every failure here is fail-open. A broken local store yields the default
//! profile; a broken remote yields the local profile unchanged.

use chrono::NaiveDate;

use crate::core::Challenge;
use crate::error::{FailOpen, Result};
use crate::profile::progression::{self, ProgressChanges, SessionResult};
use crate::profile::stats::UserStats;
use crate::profile::sync;
use crate::storage::{IdentityProvider, ModeTag, ProfileStore, RemoteStore, SessionOutcome};

/// Owns the local store and the catalog used by the unlock rule.
pub struct ProfileManager<S: ProfileStore> {
    store: S,
    catalog: Vec<Challenge>,
}

impl<S: ProfileStore> ProfileManager<S> {
    /// Create a new profile manager.
    pub fn new(store: S, catalog: Vec<Challenge>) -> Self {
        Self { store, catalog }
    }

    /// The catalog used for unlocks.
    pub fn catalog(&self) -> &[Challenge] {
        &self.catalog
    }

    /// Load the profile, falling back to defaults when nothing is stored or
    /// the store is unreadable.
    ///
    /// A stored profile that breaks an invariant is repaired and written back.
    pub fn load(&self) -> UserStats {
        let Some(stored) = self.store.read().fail_open_default("loading profile") else {
            return UserStats::default();
        };

        let repaired = stored.clone().normalized();
        if repaired != stored {
            tracing::debug!("writing back normalized profile");
            self.save(&repaired)
                .fail_open_default("saving normalized profile");
        }
        repaired
    }

    /// Overwrite the stored profile.
    pub fn save(&self, stats: &UserStats) -> Result<()> {
        self.store.write(stats)
    }

    /// Clear storage and return a fresh profile.
    pub fn reset(&self) -> UserStats {
        self.store.clear().fail_open_default("clearing profile");
        tracing::info!("profile reset");
        UserStats::default()
    }

    /// Apply a finished session and persist the result.
    pub fn apply_result(
        &self,
        stats: &mut UserStats,
        result: &SessionResult,
        today: NaiveDate,
    ) -> ProgressChanges {
        let changes = progression::apply_result(stats, result, &self.catalog, today);
        self.save(stats).fail_open_default("saving profile");
        changes
    }

    /// Reconcile the local profile with the remote copy.
    ///
    /// Without an identity the local profile is returned untouched. With no
    /// remote document the local profile is uploaded verbatim. Otherwise the
    /// merged profile is persisted on both sides. Remote failures return
    /// `local` unchanged.
    pub fn sync_with_cloud<I, R>(&self, identity: &I, remote: &R, local: UserStats) -> UserStats
    where
        I: IdentityProvider + ?Sized,
        R: RemoteStore + ?Sized,
    {
        let Some(user_id) = identity.user_id() else {
            return local;
        };

        let remote_stats = match remote.fetch(&user_id) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(user = %user_id, "fetching remote profile: {} (fail-open: keeping local)", err);
                return local;
            }
        };

        let Some(remote_stats) = remote_stats else {
            remote
                .store(&user_id, &local)
                .fail_open_default("uploading profile");
            tracing::info!(user = %user_id, "uploaded local profile");
            return local;
        };

        let merged = sync::merge(&local, &remote_stats);
        self.save(&merged).fail_open_default("saving merged profile");
        remote
            .store(&user_id, &merged)
            .fail_open_default("storing merged profile");

        tracing::info!(user = %user_id, xp = merged.xp, "synced profile");
        merged
    }

    /// Append a session outcome to the remote log when signed in.
    pub fn record_outcome<I, R>(&self, identity: &I, remote: &R, mode: ModeTag, result: &SessionResult)
    where
        I: IdentityProvider + ?Sized,
        R: RemoteStore + ?Sized,
    {
        if let Some(user_id) = identity.user_id() {
            let outcome =
                SessionOutcome::new(mode, result.xp_gained, result.passed, result.challenge_id);
            remote
                .append_outcome(&user_id, &outcome)
                .fail_open_default("recording session outcome");
        }
    }
}
