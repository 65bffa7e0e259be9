//! Catalog command for ear-dojo.
//!
//! Lists the curriculum with the learner's lock state and best scores.

use serde::{Deserialize, Serialize};

use crate::core::Level;
use crate::profile::{can_attempt, ProfileManager};
use crate::storage::ProfileStore;

/// Options for the catalog command.
#[derive(Debug, Clone, Default)]
pub struct CatalogOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Only show one tier.
    pub level: Option<Level>,
}

/// One catalog row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeInfo {
    pub id: u32,
    pub level: Level,
    pub title: String,
    pub subtitle: String,
    pub notes: usize,
    pub sequence_length: usize,
    pub tasks: u32,
    pub exam: bool,
    pub unlocked: bool,
    /// Exams can be attempted before they unlock.
    pub attemptable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_score: Option<u32>,
}

/// Output format for the catalog command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogOutput {
    pub success: bool,
    pub challenges: Vec<ChallengeInfo>,
}

/// The catalog command implementation.
pub struct CatalogCommand<S: ProfileStore> {
    manager: ProfileManager<S>,
}

impl<S: ProfileStore> CatalogCommand<S> {
    /// Create a new catalog command.
    pub fn new(manager: ProfileManager<S>) -> Self {
        Self { manager }
    }

    /// Run the catalog command.
    pub fn run(&self, options: &CatalogOptions) -> CatalogOutput {
        let stats = self.manager.load();
        let challenges = self
            .manager
            .catalog()
            .iter()
            .filter(|c| options.level.is_none_or(|level| c.level == level))
            .map(|c| ChallengeInfo {
                id: c.id,
                level: c.level,
                title: c.title.clone(),
                subtitle: c.subtitle.clone(),
                notes: c.note_pool.len(),
                sequence_length: c.sequence_length,
                tasks: c.tasks_count,
                exam: c.is_exam,
                unlocked: stats.is_unlocked(c.id),
                attemptable: can_attempt(&stats, c),
                high_score: stats.high_score(c.id),
            })
            .collect();

        CatalogOutput {
            success: true,
            challenges,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &CatalogOutput, options: &CatalogOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &CatalogOutput) -> String {
        let mut lines = Vec::new();
        let mut current_level = None;

        for info in &output.challenges {
            if current_level != Some(info.level) {
                if current_level.is_some() {
                    lines.push(String::new());
                }
                lines.push(format!("=== {} ===", info.level));
                current_level = Some(info.level);
            }

            let marker = if info.unlocked {
                " "
            } else if info.attemptable {
                "?"
            } else {
                "x"
            };
            let best = info
                .high_score
                .map(|score| format!("  best {}", score))
                .unwrap_or_default();
            lines.push(format!(
                "[{}] {:>3}  {}{} - {}{}",
                marker,
                info.id,
                info.title,
                if info.exam { " (exam)" } else { "" },
                info.subtitle,
                best
            ));
        }

        if lines.is_empty() {
            return "No challenges.\n".to_string();
        }
        lines.join("\n")
    }
}
