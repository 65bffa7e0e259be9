//! Local/remote profile reconciliation.
//!
//! The merge is deterministic and, apart from the fields with an explicit
//! winner (heatmap, theme, hearts), commutative: progress is never lost
//! whichever side is newer.

use crate::profile::stats::UserStats;

/// Merge a local profile with its remote copy.
///
/// - `xp`, `streak`: maximum
/// - `level`: recomputed from the merged `xp` (equals the maximum level)
/// - `unlocked_challenges`: union
/// - `high_scores`: per-key maximum
/// - `heatmap`: remote wins
/// - `theme`, `hearts`: local wins
/// - `last_played_date`: the later date
pub fn merge(local: &UserStats, remote: &UserStats) -> UserStats {
    let mut high_scores = remote.high_scores.clone();
    for (&id, &score) in &local.high_scores {
        let best = high_scores.entry(id).or_insert(score);
        *best = (*best).max(score);
    }

    let merged = UserStats {
        xp: local.xp.max(remote.xp),
        level: local.level.max(remote.level),
        hearts: local.hearts,
        streak: local.streak.max(remote.streak),
        heatmap: remote.heatmap,
        unlocked_challenges: local
            .unlocked_challenges
            .union(&remote.unlocked_challenges)
            .copied()
            .collect(),
        high_scores,
        last_played_date: local.last_played_date.max(remote.last_played_date),
        theme: local.theme.clone(),
    };

    merged.normalized()
}
