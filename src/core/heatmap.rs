//! Mastery heatmap: one proficiency score per pitch-class interval.
//!
//! Scores live in [0, 1]. A correct answer adds [`CORRECT_STEP`], a wrong one
//! subtracts [`WRONG_STEP`], so a mistake costs twice what a success earns.

use serde::{Deserialize, Deserializer, Serialize};

use crate::core::pitch::PITCH_CLASSES;

/// Score gained for a correctly identified interval.
pub const CORRECT_STEP: f64 = 0.05;

/// Score lost for a missed interval.
pub const WRONG_STEP: f64 = 0.10;

/// Score every interval starts at.
pub const INITIAL_SCORE: f64 = 0.5;

/// Number of weak spots the generators target.
pub const DEFAULT_WEAK_SPOTS: usize = 4;

/// Per-interval mastery scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Heatmap([f64; PITCH_CLASSES]);

impl Heatmap {
    /// A heatmap with every interval at `score` (clamped).
    pub fn filled(score: f64) -> Self {
        Self([clamp(score); PITCH_CLASSES])
    }

    /// Build from raw scores, clamping each to [0, 1].
    pub fn from_scores(scores: [f64; PITCH_CLASSES]) -> Self {
        Self(scores.map(clamp))
    }

    /// Score of an interval. Out-of-range indices wrap modulo 12.
    pub fn score(&self, index: usize) -> f64 {
        self.0[index % PITCH_CLASSES]
    }

    /// All scores in interval order.
    pub fn scores(&self) -> &[f64; PITCH_CLASSES] {
        &self.0
    }

    /// Record one graded answer for an interval.
    pub fn update(&mut self, index: usize, correct: bool) {
        let slot = &mut self.0[index % PITCH_CLASSES];
        *slot = if correct {
            (*slot + CORRECT_STEP).min(1.0)
        } else {
            (*slot - WRONG_STEP).max(0.0)
        };
    }

    /// The `k` weakest intervals, weakest first.
    ///
    /// Ties keep interval order (stable sort), so the result is fully
    /// determined by the scores.
    pub fn weak_spots(&self, k: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..PITCH_CLASSES).collect();
        indices.sort_by(|a, b| self.0[*a].total_cmp(&self.0[*b]));
        indices.truncate(k);
        indices
    }

    /// Mean score across all intervals.
    pub fn average(&self) -> f64 {
        self.0.iter().sum::<f64>() / PITCH_CLASSES as f64
    }
}

impl Default for Heatmap {
    fn default() -> Self {
        Self::filled(INITIAL_SCORE)
    }
}

impl<'de> Deserialize<'de> for Heatmap {
    /// Accepts any-length numeric arrays: missing slots take the initial
    /// score, extra slots are dropped, and values are clamped.
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Vec<f64> = Vec::deserialize(deserializer)?;
        let mut scores = [INITIAL_SCORE; PITCH_CLASSES];
        for (slot, value) in scores.iter_mut().zip(raw) {
            *slot = value;
        }
        Ok(Self::from_scores(scores))
    }
}

fn clamp(score: f64) -> f64 {
    if score.is_nan() {
        INITIAL_SCORE
    } else {
        score.clamp(0.0, 1.0)
    }
}
