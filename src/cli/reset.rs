//! Reset command for ear-dojo.
//!
//! Clears the stored profile.

use serde::{Deserialize, Serialize};

use crate::profile::ProfileManager;
use crate::storage::ProfileStore;

/// Options for the reset command.
#[derive(Debug, Clone, Default)]
pub struct ResetOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the reset command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetOutput {
    pub success: bool,
    /// XP the profile had before the reset.
    pub previous_xp: u32,
}

/// The reset command implementation.
pub struct ResetCommand<S: ProfileStore> {
    manager: ProfileManager<S>,
}

impl<S: ProfileStore> ResetCommand<S> {
    /// Create a new reset command.
    pub fn new(manager: ProfileManager<S>) -> Self {
        Self { manager }
    }

    /// Run the reset command.
    pub fn run(&self, _options: &ResetOptions) -> ResetOutput {
        let previous_xp = self.manager.load().xp;
        self.manager.reset();
        ResetOutput {
            success: true,
            previous_xp,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ResetOutput, options: &ResetOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            format!("Profile reset ({} XP cleared).", output.previous_xp)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog;
    use crate::profile::UserStats;
    use crate::storage::MemoryProfileStore;
    use std::sync::Arc;

    #[test]
    fn test_reset_clears_profile() {
        let store = Arc::new(MemoryProfileStore::with_profile(UserStats {
            xp: 250,
            ..UserStats::default()
        }));
        let cmd = ResetCommand::new(ProfileManager::new(Arc::clone(&store), catalog::generate()));

        let output = cmd.run(&ResetOptions::default());

        assert!(output.success);
        assert_eq!(output.previous_xp, 250);
        assert!(store.snapshot().is_none());
        assert_eq!(
            cmd.format_output(&output, &ResetOptions::default()),
            "Profile reset (250 XP cleared)."
        );
    }
}
