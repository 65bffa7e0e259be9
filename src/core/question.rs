//! Question generation for Dojo, Practice, and Challenge/Exam modes.
//!
//! Every draw goes through [`QuestionGenerator::draw`], which is only ever
//! handed a non-empty pool: weak-spot intersections that come up empty fall
//! back to the broader pool before any randomness is involved.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::catalog::{self, Challenge, Level, OctaveRange, CHROMATIC_POOL, MAJOR_POOL};
use crate::core::heatmap::{Heatmap, DEFAULT_WEAK_SPOTS};
use crate::core::pitch::{pitch_name, Pitch, KEY_BAND_LOW, PITCH_CLASSES, TONIC};
use crate::profile::UserStats;

/// Probability a Dojo question targets a weak spot.
pub const DOJO_WEAK_PROBABILITY: f64 = 0.7;

/// Probability a non-modulating challenge still picks a random key.
pub const SURPRISE_MODULATION_PROBABILITY: f64 = 0.2;

/// A single drill item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Absolute pitch the intervals are measured from.
    pub key_center: Pitch,
    /// Notes the learner must reproduce, in order.
    pub target_melody: Vec<Pitch>,
    /// Short human-readable description.
    pub description: String,
}

impl Question {
    /// Notes in the target melody.
    pub fn len(&self) -> usize {
        self.target_melody.len()
    }

    /// Whether the melody is empty (never true for generated questions).
    pub fn is_empty(&self) -> bool {
        self.target_melody.is_empty()
    }
}

/// Base settings of a Practice difficulty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PracticeSettings {
    pub pool: &'static [u8],
    pub length: usize,
    pub range: OctaveRange,
}

impl PracticeSettings {
    /// Base pool, length, and range for a difficulty.
    pub fn for_level(level: Level) -> Self {
        match level {
            Level::Beginner => Self {
                pool: MAJOR_POOL,
                length: 1,
                range: OctaveRange::One,
            },
            Level::Intermediate => Self {
                pool: CHROMATIC_POOL,
                length: 3,
                range: OctaveRange::OneAndHalf,
            },
            Level::Master => Self {
                pool: CHROMATIC_POOL,
                length: 5,
                range: OctaveRange::Two,
            },
        }
    }
}

/// Intersect `pool` with the heatmap's weak spots, keeping `pool` when the
/// intersection is empty.
pub fn weak_pool(pool: &[u8], heatmap: &Heatmap) -> Vec<u8> {
    let weak = heatmap.weak_spots(DEFAULT_WEAK_SPOTS);
    let intersection: Vec<u8> = pool
        .iter()
        .copied()
        .filter(|n| weak.contains(&usize::from(*n)))
        .collect();
    if intersection.is_empty() {
        pool.to_vec()
    } else {
        intersection
    }
}

/// Randomized question generator.
///
/// Owns its RNG so a seeded generator reproduces the same batches.
#[derive(Debug, Clone)]
pub struct QuestionGenerator {
    catalog: Vec<Challenge>,
    rng: ChaCha8Rng,
}

impl QuestionGenerator {
    /// Create a generator seeded from OS entropy.
    pub fn new(catalog: Vec<Challenge>) -> Self {
        Self {
            catalog,
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Create a generator with a fixed seed.
    pub fn seeded(catalog: Vec<Challenge>, seed: u64) -> Self {
        Self {
            catalog,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Create a generator with an optional seed.
    pub fn with_seed(catalog: Vec<Challenge>, seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(catalog, seed),
            None => Self::new(catalog),
        }
    }

    /// The catalog this generator draws from.
    pub fn catalog(&self) -> &[Challenge] {
        &self.catalog
    }

    /// Single-note questions from unlocked material, biased toward weak spots.
    pub fn dojo(&mut self, stats: &UserStats, count: usize, force_weak: bool) -> Vec<Question> {
        let mut unlocked = catalog::unlocked_notes(&self.catalog, stats.highest_unlocked());
        if unlocked.is_empty() {
            // Only reachable with an empty catalog; id 1 is always unlocked.
            unlocked = catalog::TRIAD_POOL.to_vec();
        }
        let weak = weak_pool(&unlocked, &stats.heatmap);

        tracing::debug!(
            count,
            force_weak,
            unlocked = ?unlocked,
            weak = ?weak,
            "generating dojo questions"
        );

        (0..count)
            .map(|_| {
                let use_weak = force_weak || self.rng.gen_bool(DOJO_WEAK_PROBABILITY);
                let pool = if use_weak { &weak } else { &unlocked };
                let pitch = TONIC + self.draw(pool);
                Question {
                    key_center: TONIC,
                    target_melody: vec![pitch],
                    description: format!("Dojo · {}", pitch_name(pitch)),
                }
            })
            .collect()
    }

    /// Difficulty-tiered practice questions.
    pub fn practice(
        &mut self,
        difficulty: Level,
        stats: &UserStats,
        count: usize,
        force_weak: bool,
    ) -> Vec<Question> {
        let settings = PracticeSettings::for_level(difficulty);
        let pool = if force_weak {
            weak_pool(settings.pool, &stats.heatmap)
        } else {
            settings.pool.to_vec()
        };

        tracing::debug!(count, force_weak, %difficulty, pool = ?pool, "generating practice questions");

        (0..count)
            .map(|_| {
                let key_center = if difficulty == Level::Beginner {
                    TONIC
                } else {
                    self.random_key()
                };
                let melody = self.melody(key_center, &pool, settings.length, settings.range);
                Question {
                    description: format!(
                        "{} practice · {} · {} notes",
                        difficulty,
                        pitch_name(key_center),
                        melody.len()
                    ),
                    key_center,
                    target_melody: melody,
                }
            })
            .collect()
    }

    /// The fixed-size question batch for a catalog challenge.
    pub fn challenge(&mut self, challenge: &Challenge) -> Vec<Question> {
        let pool: Vec<u8> = if challenge.note_pool.is_empty() {
            CHROMATIC_POOL.to_vec()
        } else {
            challenge.note_pool.clone()
        };

        tracing::debug!(id = challenge.id, exam = challenge.is_exam, "generating challenge questions");

        (0..challenge.tasks_count)
            .map(|_| {
                let surprise = self.rng.gen_bool(SURPRISE_MODULATION_PROBABILITY);
                let key_center = if challenge.is_modulating || surprise {
                    self.random_key()
                } else {
                    TONIC
                };
                let melody = self.melody(
                    key_center,
                    &pool,
                    challenge.sequence_length.max(1),
                    challenge.octave_range,
                );
                Question {
                    description: format!("{} · {}", challenge.title, pitch_name(key_center)),
                    key_center,
                    target_melody: melody,
                }
            })
            .collect()
    }

    /// Build one melody: key + pool draw, plus an octave shift when the range
    /// exceeds one octave.
    fn melody(
        &mut self,
        key_center: Pitch,
        pool: &[u8],
        length: usize,
        range: OctaveRange,
    ) -> Vec<Pitch> {
        (0..length)
            .map(|_| {
                let mut pitch = i16::from(key_center) + i16::from(self.draw(pool));
                if range.displaces() {
                    let bound = range.shift_bound();
                    let octaves = self.rng.gen_range(-bound..bound);
                    pitch += i16::from(octaves) * PITCH_CLASSES as i16;
                }
                pitch.clamp(0, 127) as Pitch
            })
            .collect()
    }

    fn random_key(&mut self) -> Pitch {
        KEY_BAND_LOW + self.rng.gen_range(0..PITCH_CLASSES as u8)
    }

    /// Uniform draw from a pool the caller guarantees is non-empty.
    fn draw(&mut self, pool: &[u8]) -> u8 {
        debug_assert!(!pool.is_empty(), "draw called with an empty pool");
        if pool.is_empty() {
            return 0;
        }
        pool[self.rng.gen_range(0..pool.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pitch::interval_of;

    fn generator() -> QuestionGenerator {
        QuestionGenerator::seeded(catalog::generate(), 7)
    }

    fn stats_with_scores(scores: [f64; 12]) -> UserStats {
        UserStats {
            heatmap: Heatmap::from_scores(scores),
            ..UserStats::default()
        }
    }

    #[test]
    fn test_practice_beginner_single_note_on_tonic() {
        let mut gen = generator();
        let questions = gen.practice(Level::Beginner, &UserStats::default(), 5, false);

        assert_eq!(questions.len(), 5);
        for q in &questions {
            assert_eq!(q.target_melody.len(), 1);
            assert_eq!(q.key_center, TONIC);
            assert!(MAJOR_POOL.contains(&(interval_of(q.target_melody[0], TONIC) as u8)));
        }
    }

    #[test]
    fn test_practice_master_lengths_and_keys() {
        let mut gen = generator();
        let questions = gen.practice(Level::Master, &UserStats::default(), 50, false);

        for q in &questions {
            assert_eq!(q.target_melody.len(), 5);
            assert!((KEY_BAND_LOW..KEY_BAND_LOW + 12).contains(&q.key_center));
            for &note in &q.target_melody {
                let offset = i16::from(note) - i16::from(q.key_center);
                // pool 0..=11 plus shifts in [-2, +2) octaves
                assert!((-24..12 + 12).contains(&offset), "offset {}", offset);
            }
        }
    }

    #[test]
    fn test_practice_force_weak_restricts_pool() {
        let mut scores = [0.9; 12];
        scores[1] = 0.1;
        scores[6] = 0.2;
        scores[8] = 0.3;
        scores[10] = 0.4;
        let stats = stats_with_scores(scores);

        let mut gen = generator();
        for q in gen.practice(Level::Intermediate, &stats, 30, true) {
            for &note in &q.target_melody {
                let interval = interval_of(note, q.key_center);
                assert!([1, 6, 8, 10].contains(&interval), "interval {}", interval);
            }
        }
    }

    #[test]
    fn test_practice_force_weak_falls_back_when_disjoint() {
        // Weak spots are all outside the major scale.
        let mut scores = [0.9; 12];
        for i in [1, 3, 6, 8] {
            scores[i] = 0.0;
        }
        let stats = stats_with_scores(scores);

        let mut gen = generator();
        let questions = gen.practice(Level::Beginner, &stats, 20, true);
        assert_eq!(questions.len(), 20);
        for q in questions {
            let interval = interval_of(q.target_melody[0], TONIC) as u8;
            assert!(MAJOR_POOL.contains(&interval));
        }
    }

    #[test]
    fn test_weak_pool_intersection_and_fallback() {
        let heatmap = Heatmap::default(); // weak spots 0,1,2,3
        assert_eq!(weak_pool(&[0, 4, 7], &heatmap), vec![0]);
        assert_eq!(weak_pool(&[5, 7], &heatmap), vec![5, 7]);
    }

    #[test]
    fn test_dojo_uses_only_unlocked_notes() {
        let stats = UserStats::default(); // only challenge 1: triad
        let mut gen = generator();
        let questions = gen.dojo(&stats, 40, false);

        assert_eq!(questions.len(), 40);
        for q in questions {
            assert_eq!(q.key_center, TONIC);
            assert_eq!(q.target_melody.len(), 1);
            let interval = interval_of(q.target_melody[0], TONIC);
            assert!([0, 4, 7].contains(&interval));
        }
    }

    #[test]
    fn test_dojo_mixes_weak_and_full_pool() {
        // Weak spots 0..=3 meet the triad only at the root.
        let stats = UserStats::default();
        let mut gen = generator();
        let questions = gen.dojo(&stats, 5000, false);

        let roots = questions
            .iter()
            .filter(|q| interval_of(q.target_melody[0], TONIC) == 0)
            .count();
        // 70% from the weak pool, plus a third of the full-pool draws.
        let ratio = roots as f64 / questions.len() as f64;
        assert!(ratio > 0.76 && ratio < 0.84, "ratio {}", ratio);
    }

    #[test]
    fn test_dojo_force_weak_hits_weak_intersection() {
        let mut stats = UserStats::default();
        stats.unlocked_challenges.extend(2..=11); // triad + pentatonic
        let mut scores = [0.9; 12];
        scores[9] = 0.0;
        scores[1] = 0.1; // weak but locked
        stats.heatmap = Heatmap::from_scores(scores);

        let mut gen = generator();
        for q in gen.dojo(&stats, 20, true) {
            // weak spots: 9, 1, then 0, 2 by index order; unlocked intersect = {0, 2, 9}
            let interval = interval_of(q.target_melody[0], TONIC);
            assert!([0, 2, 9].contains(&interval), "interval {}", interval);
        }
    }

    #[test]
    fn test_challenge_count_length_and_pool() {
        let catalog = catalog::generate();
        let mut gen = generator();
        let challenge = &catalog[0];
        let questions = gen.challenge(challenge);

        assert_eq!(questions.len(), challenge.tasks_count as usize);
        for q in &questions {
            assert_eq!(q.target_melody.len(), challenge.sequence_length);
            for &note in &q.target_melody {
                let interval = interval_of(note, q.key_center) as u8;
                assert!(challenge.note_pool.contains(&interval));
            }
        }
    }

    #[test]
    fn test_challenge_non_modulating_mostly_tonic() {
        let catalog = catalog::generate();
        let mut gen = generator();
        let challenge = catalog[0].clone();
        assert!(!challenge.is_modulating);

        let mut on_tonic = 0;
        let mut total = 0;
        for _ in 0..50 {
            for q in gen.challenge(&challenge) {
                total += 1;
                if q.key_center == TONIC {
                    on_tonic += 1;
                }
            }
        }
        // 80% stay on the tonic, plus 1/12 of the surprise keys land on it.
        let ratio = on_tonic as f64 / total as f64;
        assert!(ratio > 0.7 && ratio < 0.95, "ratio {}", ratio);
    }

    #[test]
    fn test_exam_batch_is_double() {
        let catalog = catalog::generate();
        let exam = catalog.iter().find(|c| c.is_exam).unwrap();
        let mut gen = generator();
        assert_eq!(gen.challenge(exam).len(), 20);
    }

    #[test]
    fn test_seeded_generators_agree() {
        let stats = UserStats::default();
        let a = QuestionGenerator::seeded(catalog::generate(), 99).practice(
            Level::Master,
            &stats,
            10,
            false,
        );
        let b = QuestionGenerator::seeded(catalog::generate(), 99).practice(
            Level::Master,
            &stats,
            10,
            false,
        );
        assert_eq!(a, b);
    }
}
