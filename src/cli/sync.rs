//! Sync command for ear-dojo.
//!
//! Reconciles the local profile with the remote copy. Never fails: without
//! an identity or with an unreachable remote, the local profile stays as is.

use serde::{Deserialize, Serialize};

use crate::profile::ProfileManager;
use crate::storage::{IdentityProvider, ProfileStore, RemoteStore};

/// Options for the sync command.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the sync command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub xp: u32,
    pub level: u32,
    pub unlocked_count: usize,
}

/// The sync command implementation.
pub struct SyncCommand<S: ProfileStore, I: IdentityProvider, R: RemoteStore> {
    manager: ProfileManager<S>,
    identity: I,
    remote: R,
}

impl<S: ProfileStore, I: IdentityProvider, R: RemoteStore> SyncCommand<S, I, R> {
    /// Create a new sync command.
    pub fn new(manager: ProfileManager<S>, identity: I, remote: R) -> Self {
        Self {
            manager,
            identity,
            remote,
        }
    }

    /// Run the sync command.
    pub fn run(&self, _options: &SyncOptions) -> SyncOutput {
        let local = self.manager.load();
        let synced = self
            .manager
            .sync_with_cloud(&self.identity, &self.remote, local);

        SyncOutput {
            success: true,
            user: self.identity.user_id(),
            xp: synced.xp,
            level: synced.level,
            unlocked_count: synced.unlocked_challenges.len(),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &SyncOutput, options: &SyncOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        match &output.user {
            Some(user) => format!(
                "Synced as {}: level {}, {} XP, {} challenge(s) unlocked.",
                user, output.level, output.xp, output.unlocked_count
            ),
            None => "Not signed in; set EAR_DOJO_USER or [sync] user_id to sync.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog;
    use crate::profile::UserStats;
    use crate::storage::{MemoryProfileStore, MemoryRemoteStore, StaticIdentity};
    use std::sync::Arc;

    fn manager(xp: u32) -> ProfileManager<MemoryProfileStore> {
        let store = MemoryProfileStore::with_profile(UserStats {
            xp,
            ..UserStats::default()
        });
        ProfileManager::new(store, catalog::generate())
    }

    #[test]
    fn test_sync_anonymous() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let cmd = SyncCommand::new(manager(40), StaticIdentity::anonymous(), Arc::clone(&remote));

        let output = cmd.run(&SyncOptions::default());

        assert!(output.success);
        assert!(output.user.is_none());
        assert_eq!(output.xp, 40);
        assert!(cmd
            .format_output(&output, &SyncOptions::default())
            .contains("Not signed in"));
    }

    #[test]
    fn test_sync_merges_remote_progress() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let mut remote_stats = UserStats {
            xp: 1100,
            ..UserStats::default()
        };
        remote_stats.unlocked_challenges.extend([2, 3]);
        remote.store("sora", &remote_stats).unwrap();
        let cmd = SyncCommand::new(manager(40), StaticIdentity::user("sora"), Arc::clone(&remote));

        let output = cmd.run(&SyncOptions::default());

        assert_eq!(output.user.as_deref(), Some("sora"));
        assert_eq!(output.xp, 1100);
        assert_eq!(output.level, 3);
        assert_eq!(output.unlocked_count, 3);
        assert_eq!(remote.document("sora").unwrap().xp, 1100);
    }

    #[test]
    fn test_sync_offline_keeps_local() {
        let remote = Arc::new(MemoryRemoteStore::new());
        remote.set_offline(true);
        let cmd = SyncCommand::new(manager(40), StaticIdentity::user("sora"), Arc::clone(&remote));

        let output = cmd.run(&SyncOptions::default());

        assert!(output.success);
        assert_eq!(output.xp, 40);
    }
}
