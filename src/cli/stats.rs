//! Stats command for ear-dojo.
//!
//! Displays the learner profile: level, hearts, streak, and weak spots.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::heatmap::DEFAULT_WEAK_SPOTS;
use crate::core::interval_name;
use crate::profile::{ProfileManager, UserStats, MAX_HEARTS, XP_PER_LEVEL};
use crate::storage::ProfileStore;

/// Options for the stats command.
#[derive(Debug, Clone, Default)]
pub struct StatsOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the stats command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsOutput {
    pub success: bool,
    pub xp: u32,
    pub level: u32,
    /// XP still needed for the next level.
    pub xp_to_next_level: u32,
    pub hearts: u8,
    pub streak: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_played: Option<NaiveDate>,
    pub highest_unlocked: u32,
    pub unlocked_count: usize,
    /// Weakest intervals, weakest first.
    pub weak_spots: Vec<String>,
    /// Mastery score per interval, 0 (tonic) through 11.
    pub heatmap: Vec<f64>,
}

impl StatsOutput {
    /// Build the output from a profile.
    pub fn from_stats(stats: &UserStats) -> Self {
        Self {
            success: true,
            xp: stats.xp,
            level: stats.level,
            xp_to_next_level: XP_PER_LEVEL - stats.xp % XP_PER_LEVEL,
            hearts: stats.hearts,
            streak: stats.streak,
            last_played: stats.last_played_date,
            highest_unlocked: stats.highest_unlocked(),
            unlocked_count: stats.unlocked_challenges.len(),
            weak_spots: stats
                .heatmap
                .weak_spots(DEFAULT_WEAK_SPOTS)
                .into_iter()
                .map(|i| interval_name(i).to_string())
                .collect(),
            heatmap: stats.heatmap.scores().to_vec(),
        }
    }
}

/// The stats command implementation.
pub struct StatsCommand<S: ProfileStore> {
    manager: ProfileManager<S>,
}

impl<S: ProfileStore> StatsCommand<S> {
    /// Create a new stats command.
    pub fn new(manager: ProfileManager<S>) -> Self {
        Self { manager }
    }

    /// Run the stats command.
    pub fn run(&self, _options: &StatsOptions) -> StatsOutput {
        StatsOutput::from_stats(&self.manager.load())
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &StatsOutput, options: &StatsOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &StatsOutput) -> String {
        let mut lines = Vec::new();
        lines.push("=== Ear Dojo ===\n".to_string());

        lines.push(format!(
            "Level {}  ({} XP, {} to next)",
            output.level, output.xp, output.xp_to_next_level
        ));
        lines.push(format!(
            "Hearts {}{}",
            "♥".repeat(usize::from(output.hearts)),
            "·".repeat(usize::from(MAX_HEARTS.saturating_sub(output.hearts)))
        ));
        let last = output
            .last_played
            .map(|date| format!(" (last played {})", date))
            .unwrap_or_default();
        lines.push(format!("Streak {} day(s){}", output.streak, last));
        lines.push(format!(
            "Unlocked {} challenge(s), up to #{}",
            output.unlocked_count, output.highest_unlocked
        ));

        lines.push(String::new());
        lines.push("Mastery".to_string());
        for (i, score) in output.heatmap.iter().enumerate() {
            let filled = (score * 20.0).round() as usize;
            lines.push(format!(
                "  {:>3} {:<20} {:>3.0}%",
                interval_name(i),
                "#".repeat(filled),
                score * 100.0
            ));
        }
        lines.push(format!("Weak spots: {}", output.weak_spots.join(", ")));

        lines.join("\n")
    }
}
