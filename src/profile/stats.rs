//! The learner profile.
//!
//! `UserStats` is the only long-lived mutable state. It serializes as a flat
//! JSON object; every field defaults independently, so profiles written by
//! older versions load with new fields at their initial values. A field that
//! is null or of the wrong type falls back to its default without discarding
//! the rest of the document.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::core::Heatmap;

/// XP per level.
pub const XP_PER_LEVEL: u32 = 500;

/// Maximum (and initial) hearts.
pub const MAX_HEARTS: u8 = 5;

/// The challenge every learner starts with.
pub const FIRST_CHALLENGE: u32 = 1;

/// Theme a new profile starts with.
pub const DEFAULT_THEME: &str = "dark";

/// Level for a given XP total: `floor(xp / 500) + 1`.
pub fn level_for_xp(xp: u32) -> u32 {
    xp / XP_PER_LEVEL + 1
}

/// The learner profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    /// Total experience; only grows, except on reset.
    pub xp: u32,
    /// Derived from `xp`; recomputed, never set directly.
    pub level: u32,
    /// Lives, 0..=5.
    pub hearts: u8,
    /// Consecutive calendar days with a passed Dojo/Practice session.
    pub streak: u32,
    /// Per-interval mastery.
    pub heatmap: Heatmap,
    /// Challenge ids the learner may attempt. Always contains 1; never shrinks.
    pub unlocked_challenges: BTreeSet<u32>,
    /// Best XP per challenge id; never decreases.
    pub high_scores: BTreeMap<u32, u32>,
    /// Day of the last passed Dojo/Practice session.
    pub last_played_date: Option<NaiveDate>,
    /// Display theme.
    pub theme: String,
}

impl Default for UserStats {
    fn default() -> Self {
        Self {
            xp: 0,
            level: 1,
            hearts: MAX_HEARTS,
            streak: 0,
            heatmap: Heatmap::default(),
            unlocked_challenges: BTreeSet::from([FIRST_CHALLENGE]),
            high_scores: BTreeMap::new(),
            last_played_date: None,
            theme: DEFAULT_THEME.to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for UserStats {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self::from_fields(&fields))
    }
}

/// Read one field, or `None` when it is absent or malformed.
fn field<T: DeserializeOwned>(fields: &Map<String, Value>, key: &str) -> Option<T> {
    let value = fields.get(key)?;
    match T::deserialize(value) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            tracing::warn!(field = key, "ignoring malformed profile field: {}", err);
            None
        }
    }
}

impl UserStats {
    /// Build a profile from a JSON object, field by field over the defaults.
    ///
    /// Counters wider than their storage saturate, unlocks and high scores
    /// keep every well-formed entry, and `level` is always derived from `xp`.
    fn from_fields(fields: &Map<String, Value>) -> Self {
        let defaults = Self::default();

        let xp = field::<u64>(fields, "xp")
            .map(|xp| u32::try_from(xp).unwrap_or(u32::MAX))
            .unwrap_or(defaults.xp);
        let hearts = field::<u64>(fields, "hearts")
            .map(|hearts| u8::try_from(hearts).unwrap_or(u8::MAX))
            .unwrap_or(defaults.hearts);
        let streak = field::<u64>(fields, "streak")
            .map(|streak| u32::try_from(streak).unwrap_or(u32::MAX))
            .unwrap_or(defaults.streak);

        let unlocked_challenges = field::<Vec<Value>>(fields, "unlockedChallenges")
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| id.as_u64().and_then(|id| u32::try_from(id).ok()))
                    .collect()
            })
            .unwrap_or(defaults.unlocked_challenges);
        let high_scores = field::<Map<String, Value>>(fields, "highScores")
            .map(|scores| {
                scores
                    .iter()
                    .filter_map(|(id, xp)| {
                        let id = id.parse::<u32>().ok()?;
                        let xp = u32::try_from(xp.as_u64()?).ok()?;
                        Some((id, xp))
                    })
                    .collect()
            })
            .unwrap_or(defaults.high_scores);

        Self {
            xp,
            level: level_for_xp(xp),
            hearts,
            streak,
            heatmap: field(fields, "heatmap").unwrap_or(defaults.heatmap),
            unlocked_challenges,
            high_scores,
            last_played_date: field(fields, "lastPlayedDate").unwrap_or(defaults.last_played_date),
            theme: field(fields, "theme").unwrap_or(defaults.theme),
        }
    }

    /// Highest unlocked challenge id.
    pub fn highest_unlocked(&self) -> u32 {
        self.unlocked_challenges
            .last()
            .copied()
            .unwrap_or(FIRST_CHALLENGE)
    }

    /// Whether a challenge id is unlocked.
    pub fn is_unlocked(&self, id: u32) -> bool {
        self.unlocked_challenges.contains(&id)
    }

    /// Best XP recorded for a challenge.
    pub fn high_score(&self, id: u32) -> Option<u32> {
        self.high_scores.get(&id).copied()
    }

    /// Recompute `level` from `xp`.
    pub fn recompute_level(&mut self) {
        self.level = level_for_xp(self.xp);
    }

    /// Restore invariants on a profile read from storage.
    ///
    /// Re-inserts challenge 1, caps hearts, and recomputes the level. The
    /// heatmap is already clamped by its deserializer.
    ///
    /// ```
    /// use ear_dojo::UserStats;
    ///
    /// let stats: UserStats = serde_json::from_str(r#"{"hearts": 9}"#).unwrap();
    /// assert_eq!(stats.normalized().hearts, 5);
    /// ```
    pub fn normalized(mut self) -> Self {
        self.unlocked_challenges.insert(FIRST_CHALLENGE);
        self.hearts = self.hearts.min(MAX_HEARTS);
        self.recompute_level();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let stats = UserStats::default();
        assert_eq!(stats.xp, 0);
        assert_eq!(stats.level, 1);
        assert_eq!(stats.hearts, 5);
        assert_eq!(stats.streak, 0);
        assert!(stats.is_unlocked(1));
        assert_eq!(stats.highest_unlocked(), 1);
        assert!(stats.high_scores.is_empty());
        assert!(stats.last_played_date.is_none());
        assert_eq!(stats.theme, "dark");
    }

    #[test]
    fn test_level_for_xp() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(499), 1);
        assert_eq!(level_for_xp(500), 2);
        assert_eq!(level_for_xp(510), 2);
        assert_eq!(level_for_xp(1500), 4);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let stats: UserStats = serde_json::from_str(r#"{"xp": 720}"#).unwrap();
        assert_eq!(stats.xp, 720);
        assert_eq!(stats.hearts, 5);
        assert!(stats.is_unlocked(1));
        assert_eq!(stats.theme, "dark");
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let stats: UserStats =
            serde_json::from_str(r#"{"xp": 10, "avatar": "owl", "legacyScore": 3}"#).unwrap();
        assert_eq!(stats.xp, 10);
    }

    #[test]
    fn test_round_trip_shape() {
        let mut stats = UserStats::default();
        stats.high_scores.insert(3, 90);
        stats.last_played_date = NaiveDate::from_ymd_opt(2026, 10, 16);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["highScores"]["3"], 90);
        assert_eq!(json["lastPlayedDate"], "2026-10-16");
        assert!(json["unlockedChallenges"].is_array());

        let back: UserStats = serde_json::from_value(json).unwrap();
        assert_eq!(back, stats);
    }

    #[test]
    fn test_normalized_restores_invariants() {
        let stats: UserStats = serde_json::from_str(
            r#"{"xp": 1200, "level": 9, "hearts": 40, "unlockedChallenges": [4]}"#,
        )
        .unwrap();
        let stats = stats.normalized();

        assert_eq!(stats.level, 3);
        assert_eq!(stats.hearts, 5);
        assert!(stats.is_unlocked(1));
        assert!(stats.is_unlocked(4));
        assert_eq!(stats.highest_unlocked(), 4);
    }

    #[test]
    fn test_malformed_fields_fall_back_individually() {
        let stats: UserStats = serde_json::from_str(
            r#"{"xp": 900, "unlockedChallenges": [1, 2, 3], "heatmap": null, "theme": null}"#,
        )
        .unwrap();

        assert_eq!(stats.xp, 900);
        assert_eq!(stats.level, 2);
        assert_eq!(stats.unlocked_challenges, BTreeSet::from([1, 2, 3]));
        assert_eq!(stats.heatmap, Heatmap::default());
        assert_eq!(stats.theme, "dark");
    }

    #[test]
    fn test_oversized_hearts_saturate() {
        let stats: UserStats =
            serde_json::from_str(r#"{"xp": 900, "hearts": 300}"#).unwrap();
        assert_eq!(stats.xp, 900);
        assert_eq!(stats.normalized().hearts, 5);

        let stats: UserStats = serde_json::from_str(r#"{"hearts": -2}"#).unwrap();
        assert_eq!(stats.hearts, 5);
    }

    #[test]
    fn test_bad_entries_dropped_from_collections() {
        let stats: UserStats = serde_json::from_str(
            r#"{"unlockedChallenges": [1, "two", 3, -4], "highScores": {"1": 80, "x": 5, "3": "high"}}"#,
        )
        .unwrap();

        assert_eq!(stats.unlocked_challenges, BTreeSet::from([1, 3]));
        assert_eq!(stats.high_scores, BTreeMap::from([(1, 80)]));
    }

    #[test]
    fn test_non_object_is_error() {
        assert!(serde_json::from_str::<UserStats>("[1, 2]").is_err());
    }
}
