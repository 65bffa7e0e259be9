//! Progression and unlock engine.
//!
//! [`apply_result`] is the single entry point through which a finished
//! session changes XP, level, hearts, streak, unlocks, and high scores.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::{catalog, Challenge};
use crate::profile::stats::UserStats;

/// Outcome of a completed session, as handed over by the session summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    /// XP earned in the session.
    pub xp_gained: u32,
    /// Whether the pass threshold was reached.
    pub passed: bool,
    /// XP available had every question been answered first time.
    pub max_xp: u32,
    /// The catalog challenge played; `None` for Dojo and Practice.
    pub challenge_id: Option<u32>,
}

/// What changed when a result was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressChanges {
    /// Level before the result.
    pub previous_level: u32,
    /// Level after the result.
    pub level: u32,
    /// Newly unlocked challenge, if any.
    pub unlocked: Option<u32>,
    /// Whether a new high score was recorded.
    pub new_high_score: bool,
    /// Whether a heart was lost.
    pub heart_lost: bool,
    /// Streak after the result.
    pub streak: u32,
}

impl ProgressChanges {
    /// Whether the learner levelled up.
    pub fn levelled_up(&self) -> bool {
        self.level > self.previous_level
    }
}

/// Whether a learner may start a challenge.
///
/// Unlocked challenges are playable; exams may also be attempted early.
pub fn can_attempt(stats: &UserStats, challenge: &Challenge) -> bool {
    challenge.is_exam || stats.is_unlocked(challenge.id)
}

/// Apply a session result to the profile.
pub fn apply_result(
    stats: &mut UserStats,
    result: &SessionResult,
    catalog: &[Challenge],
    today: NaiveDate,
) -> ProgressChanges {
    let mut changes = ProgressChanges {
        previous_level: stats.level,
        ..ProgressChanges::default()
    };

    stats.xp = stats.xp.saturating_add(result.xp_gained);
    stats.recompute_level();

    if !result.passed {
        changes.heart_lost = stats.hearts > 0;
        stats.hearts = stats.hearts.saturating_sub(1);
    }

    match (result.challenge_id, result.passed) {
        (Some(id), true) => {
            let previous = stats.high_score(id);
            changes.new_high_score = previous.map_or(true, |best| result.xp_gained > best);
            stats
                .high_scores
                .insert(id, previous.unwrap_or(0).max(result.xp_gained));

            let next = id + 1;
            if catalog::find(catalog, next).is_some() && stats.unlocked_challenges.insert(next) {
                tracing::info!(challenge = next, "unlocked challenge");
                changes.unlocked = Some(next);
            }
        }
        (None, true) => update_streak(stats, today),
        _ => {}
    }

    changes.level = stats.level;
    changes.streak = stats.streak;

    if changes.levelled_up() {
        tracing::info!(level = stats.level, xp = stats.xp, "level up");
    }

    changes
}

/// Daily streak rule for passed Dojo/Practice sessions.
fn update_streak(stats: &mut UserStats, today: NaiveDate) {
    match stats.last_played_date {
        Some(last) if last == today => {}
        Some(last) if today.pred_opt() == Some(last) => stats.streak += 1,
        _ => stats.streak = 1,
    }
    stats.last_played_date = Some(today);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn passed(xp: u32, challenge_id: Option<u32>) -> SessionResult {
        SessionResult {
            xp_gained: xp,
            passed: true,
            max_xp: xp,
            challenge_id,
        }
    }

    fn failed(xp: u32, challenge_id: Option<u32>) -> SessionResult {
        SessionResult {
            xp_gained: xp,
            passed: false,
            max_xp: 100,
            challenge_id,
        }
    }

    #[test]
    fn test_xp_and_level_recomputed() {
        let catalog = catalog::generate();
        let mut stats = UserStats {
            xp: 490,
            ..UserStats::default()
        };

        let changes = apply_result(&mut stats, &passed(20, None), &catalog, day(2026, 1, 1));

        assert_eq!(stats.xp, 510);
        assert_eq!(stats.level, 2);
        assert!(changes.levelled_up());
    }

    #[test]
    fn test_passing_challenge_unlocks_next_and_sets_high_score() {
        let catalog = catalog::generate();
        let mut stats = UserStats::default();

        let changes = apply_result(&mut stats, &passed(90, Some(1)), &catalog, day(2026, 1, 1));

        assert!(stats.is_unlocked(1));
        assert!(stats.is_unlocked(2));
        assert_eq!(stats.high_score(1), Some(90));
        assert_eq!(changes.unlocked, Some(2));
        assert!(changes.new_high_score);
    }

    #[test]
    fn test_high_score_never_decreases() {
        let catalog = catalog::generate();
        let mut stats = UserStats::default();
        stats.high_scores.insert(1, 100);

        let changes = apply_result(&mut stats, &passed(80, Some(1)), &catalog, day(2026, 1, 1));

        assert_eq!(stats.high_score(1), Some(100));
        assert!(!changes.new_high_score);
    }

    #[test]
    fn test_last_challenge_unlocks_nothing() {
        let catalog = catalog::generate();
        let mut stats = UserStats::default();
        stats.unlocked_challenges.insert(150);

        let changes = apply_result(&mut stats, &passed(140, Some(150)), &catalog, day(2026, 1, 1));

        assert!(changes.unlocked.is_none());
        assert!(!stats.is_unlocked(151));
    }

    #[test]
    fn test_failed_session_costs_heart_only() {
        let catalog = catalog::generate();
        let mut stats = UserStats {
            streak: 4,
            last_played_date: Some(day(2026, 1, 1)),
            ..UserStats::default()
        };

        let changes = apply_result(&mut stats, &failed(30, Some(1)), &catalog, day(2026, 1, 5));

        assert_eq!(stats.hearts, 4);
        assert!(changes.heart_lost);
        assert_eq!(stats.xp, 30);
        assert!(!stats.is_unlocked(2));
        assert!(stats.high_scores.is_empty());
        assert_eq!(stats.streak, 4);
        assert_eq!(stats.last_played_date, Some(day(2026, 1, 1)));
    }

    #[test]
    fn test_failed_practice_leaves_streak() {
        let catalog = catalog::generate();
        let mut stats = UserStats {
            streak: 2,
            last_played_date: Some(day(2026, 3, 1)),
            ..UserStats::default()
        };

        apply_result(&mut stats, &failed(0, None), &catalog, day(2026, 3, 2));

        assert_eq!(stats.streak, 2);
        assert_eq!(stats.last_played_date, Some(day(2026, 3, 1)));
    }

    #[test]
    fn test_hearts_floor_at_zero() {
        let catalog = catalog::generate();
        let mut stats = UserStats {
            hearts: 0,
            ..UserStats::default()
        };

        let changes = apply_result(&mut stats, &failed(0, None), &catalog, day(2026, 1, 1));

        assert_eq!(stats.hearts, 0);
        assert!(!changes.heart_lost);
    }

    #[test]
    fn test_streak_yesterday_increments_then_same_day_holds() {
        let catalog = catalog::generate();
        let today = day(2026, 10, 16);
        let mut stats = UserStats {
            streak: 3,
            last_played_date: Some(day(2026, 10, 15)),
            ..UserStats::default()
        };

        apply_result(&mut stats, &passed(10, None), &catalog, today);
        assert_eq!(stats.streak, 4);
        assert_eq!(stats.last_played_date, Some(today));

        apply_result(&mut stats, &passed(10, None), &catalog, today);
        assert_eq!(stats.streak, 4);
    }

    #[test]
    fn test_streak_resets_after_gap() {
        let catalog = catalog::generate();
        let mut stats = UserStats {
            streak: 9,
            last_played_date: Some(day(2026, 10, 1)),
            ..UserStats::default()
        };

        apply_result(&mut stats, &passed(10, None), &catalog, day(2026, 10, 16));

        assert_eq!(stats.streak, 1);
    }

    #[test]
    fn test_first_streak_day() {
        let catalog = catalog::generate();
        let mut stats = UserStats::default();

        apply_result(&mut stats, &passed(10, None), &catalog, day(2026, 10, 16));

        assert_eq!(stats.streak, 1);
    }

    #[test]
    fn test_challenge_pass_does_not_touch_streak() {
        let catalog = catalog::generate();
        let mut stats = UserStats::default();

        apply_result(&mut stats, &passed(10, Some(1)), &catalog, day(2026, 10, 16));

        assert_eq!(stats.streak, 0);
        assert!(stats.last_played_date.is_none());
    }

    #[test]
    fn test_can_attempt_locked_exam() {
        let catalog = catalog::generate();
        let stats = UserStats::default();

        assert!(can_attempt(&stats, &catalog[0]));
        assert!(!can_attempt(&stats, &catalog[1]));
        let exam = catalog.iter().find(|c| c.is_exam).unwrap();
        assert!(can_attempt(&stats, exam));
    }

    #[test]
    fn test_early_exam_pass_unlocks_next_tier() {
        let catalog = catalog::generate();
        let mut stats = UserStats::default();

        let changes = apply_result(&mut stats, &passed(300, Some(50)), &catalog, day(2026, 1, 1));

        assert_eq!(changes.unlocked, Some(51));
        assert_eq!(stats.highest_unlocked(), 51);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_result() -> impl Strategy<Value = SessionResult> {
            (0u32..400, any::<bool>(), prop::option::of(1u32..=150)).prop_map(
                |(xp, passed, challenge_id)| SessionResult {
                    xp_gained: xp,
                    passed,
                    max_xp: 400,
                    challenge_id,
                },
            )
        }

        proptest! {
            #[test]
            fn prop_monotonic_profile(results in prop::collection::vec(arb_result(), 1..20)) {
                let catalog = catalog::generate();
                let mut stats = UserStats::default();
                let mut today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();

                for result in &results {
                    let before = stats.clone();
                    apply_result(&mut stats, result, &catalog, today);

                    prop_assert!(stats.xp >= before.xp);
                    prop_assert_eq!(stats.level, stats.xp / 500 + 1);
                    prop_assert!(stats.unlocked_challenges.is_superset(&before.unlocked_challenges));
                    for (id, score) in &before.high_scores {
                        prop_assert!(stats.high_scores[id] >= *score);
                    }
                    prop_assert!(stats.hearts <= 5);
                    today = today.succ_opt().unwrap();
                }
            }
        }
    }
}
