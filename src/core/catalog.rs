//! Curriculum catalog for ear-dojo.
//!
//! The catalog is a fixed, hand-authored table expanded into an ordered list
//! of challenges. Generation is pure: no inputs, no randomness, and two calls
//! always produce identical output.
//!
//! # Id ordering is the prerequisite chain
//!
//! Ids are assigned sequentially across all tiers in generation order, and
//! the unlock rule in [`crate::profile::progression`] unlocks `id + 1` after
//! `id` is passed. Reordering tiers or bands here changes which challenge a
//! learner unlocks next and breaks stored progress. Any reordering must be
//! made together with a migration of `unlocked_challenges`.

use serde::{Deserialize, Serialize};

use crate::core::pitch::PITCH_CLASSES;

/// Graded (non-exam) challenges per tier.
pub const CHALLENGES_PER_TIER: usize = 49;

/// Questions in a normal challenge session.
pub const TASKS_PER_CHALLENGE: u32 = 10;

/// Questions in an exam session.
pub const TASKS_PER_EXAM: u32 = TASKS_PER_CHALLENGE * 2;

/// Root triad: tonic, major third, fifth.
pub const TRIAD_POOL: &[u8] = &[0, 4, 7];
/// Major pentatonic.
pub const PENTATONIC_POOL: &[u8] = &[0, 2, 4, 7, 9];
/// Major scale.
pub const MAJOR_POOL: &[u8] = &[0, 2, 4, 5, 7, 9, 11];
/// Major scale with borrowed minor third and minor seventh.
pub const MIXTURE_POOL: &[u8] = &[0, 2, 3, 4, 5, 7, 9, 10, 11];
/// All twelve pitch classes.
pub const CHROMATIC_POOL: &[u8] = &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

/// Difficulty tier of a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Beginner,
    Intermediate,
    Master,
}

impl Level {
    /// All levels in curriculum order.
    pub const ALL: [Level; 3] = [Level::Beginner, Level::Intermediate, Level::Master];

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Master => "Master",
        }
    }

    /// Parse a level name (case-insensitive).
    pub fn parse(value: &str) -> Option<Level> {
        match value.to_lowercase().as_str() {
            "beginner" => Some(Level::Beginner),
            "intermediate" => Some(Level::Intermediate),
            "master" => Some(Level::Master),
            _ => None,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Octave span a melody may be displaced across.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OctaveRange {
    /// One octave, no displacement.
    One,
    /// One and a half octaves.
    OneAndHalf,
    /// Two octaves.
    Two,
}

impl OctaveRange {
    /// Span in octaves (1, 1.5, or 2).
    pub fn octaves(&self) -> f64 {
        match self {
            OctaveRange::One => 1.0,
            OctaveRange::OneAndHalf => 1.5,
            OctaveRange::Two => 2.0,
        }
    }

    /// Whether notes receive a random octave shift.
    pub fn displaces(&self) -> bool {
        self.octaves() > 1.0
    }

    /// Bound of the octave shift, `floor(range)`.
    ///
    /// Shifts are drawn from `[-bound, +bound)`.
    pub fn shift_bound(&self) -> i8 {
        self.octaves().floor() as i8
    }
}

/// An immutable curriculum unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    /// Sequential id; `id + 1` is the next challenge in the prerequisite chain.
    pub id: u32,
    /// Tier this challenge belongs to.
    pub level: Level,
    /// Display title.
    pub title: String,
    /// Display subtitle describing the material.
    pub subtitle: String,
    /// Pitch-class offsets relative to the key center. Never empty.
    pub note_pool: Vec<u8>,
    /// Notes per question.
    pub sequence_length: usize,
    /// Octave displacement span.
    pub octave_range: OctaveRange,
    /// Whether questions may use a non-tonic key center.
    pub is_modulating: bool,
    /// Display/difficulty flag only.
    pub chaos_mode: bool,
    /// Questions per session.
    pub tasks_count: u32,
    /// Exams grade silently with no retry.
    pub is_exam: bool,
}

/// One row of the tier table: settings for a contiguous in-tier index range.
struct Band {
    /// Exclusive upper in-tier index.
    until: usize,
    name: &'static str,
    pool: &'static [u8],
    length: usize,
    range: OctaveRange,
    modulating: bool,
    chaos: bool,
}

const fn band(
    until: usize,
    name: &'static str,
    pool: &'static [u8],
    length: usize,
    range: OctaveRange,
    modulating: bool,
    chaos: bool,
) -> Band {
    Band {
        until,
        name,
        pool,
        length,
        range,
        modulating,
        chaos,
    }
}

const BEGINNER_BANDS: &[Band] = &[
    band(10, "Triad", TRIAD_POOL, 1, OctaveRange::One, false, false),
    band(20, "Pentatonic", PENTATONIC_POOL, 1, OctaveRange::One, false, false),
    band(30, "Major Scale", MAJOR_POOL, 1, OctaveRange::One, false, false),
    band(40, "Major Scale", MAJOR_POOL, 2, OctaveRange::One, false, false),
    band(49, "Chromatic", CHROMATIC_POOL, 2, OctaveRange::One, false, false),
];

const INTERMEDIATE_BANDS: &[Band] = &[
    band(10, "Major Scale", MAJOR_POOL, 3, OctaveRange::One, false, false),
    band(20, "Modal Mixture", MIXTURE_POOL, 3, OctaveRange::OneAndHalf, false, false),
    band(30, "Chromatic", CHROMATIC_POOL, 3, OctaveRange::OneAndHalf, false, false),
    band(40, "Chromatic", CHROMATIC_POOL, 4, OctaveRange::OneAndHalf, true, false),
    band(49, "Chromatic", CHROMATIC_POOL, 4, OctaveRange::OneAndHalf, true, true),
];

const MASTER_BANDS: &[Band] = &[
    band(10, "Chromatic", CHROMATIC_POOL, 4, OctaveRange::Two, false, false),
    band(20, "Chromatic", CHROMATIC_POOL, 5, OctaveRange::Two, true, false),
    band(30, "Chromatic", CHROMATIC_POOL, 5, OctaveRange::Two, true, true),
    band(40, "Chromatic", CHROMATIC_POOL, 6, OctaveRange::Two, true, true),
    band(49, "Chromatic", CHROMATIC_POOL, 7, OctaveRange::Two, true, true),
];

fn bands_for(level: Level) -> &'static [Band] {
    match level {
        Level::Beginner => BEGINNER_BANDS,
        Level::Intermediate => INTERMEDIATE_BANDS,
        Level::Master => MASTER_BANDS,
    }
}

fn band_at(bands: &'static [Band], index: usize) -> &'static Band {
    bands
        .iter()
        .find(|b| index < b.until)
        .unwrap_or(&bands[bands.len() - 1])
}

fn subtitle(band: &Band, modulating: bool) -> String {
    let notes = if band.length == 1 { "note" } else { "notes" };
    let mut text = format!("{} · {} {}", band.name, band.length, notes);
    if band.range.displaces() {
        text.push_str(&format!(" · {} octaves", band.range.octaves()));
    }
    if modulating {
        text.push_str(" · any key");
    }
    if band.chaos {
        text.push_str(" · chaos");
    }
    text
}

/// Generate the full curriculum in prerequisite order.
pub fn generate() -> Vec<Challenge> {
    let mut challenges = Vec::with_capacity(Level::ALL.len() * (CHALLENGES_PER_TIER + 1));
    let mut next_id = 1u32;

    for level in Level::ALL {
        let bands = bands_for(level);

        for index in 0..CHALLENGES_PER_TIER {
            let band = band_at(bands, index);
            challenges.push(Challenge {
                id: next_id,
                level,
                title: format!("{} {}", level.display_name(), index + 1),
                subtitle: subtitle(band, band.modulating),
                note_pool: band.pool.to_vec(),
                sequence_length: band.length,
                octave_range: band.range,
                is_modulating: band.modulating,
                chaos_mode: band.chaos,
                tasks_count: TASKS_PER_CHALLENGE,
                is_exam: false,
            });
            next_id += 1;
        }

        let hardest = &bands[bands.len() - 1];
        challenges.push(Challenge {
            id: next_id,
            level,
            title: format!("{} Exam", level.display_name()),
            subtitle: subtitle(hardest, true),
            note_pool: hardest.pool.to_vec(),
            sequence_length: hardest.length,
            octave_range: hardest.range,
            is_modulating: true,
            chaos_mode: hardest.chaos,
            tasks_count: TASKS_PER_EXAM,
            is_exam: true,
        });
        next_id += 1;
    }

    challenges
}

/// Look up a challenge by id.
pub fn find(catalog: &[Challenge], id: u32) -> Option<&Challenge> {
    // Ids start at 1 and are dense, so index directly and verify.
    let index = usize::try_from(id.checked_sub(1)?).ok()?;
    catalog.get(index).filter(|c| c.id == id)
}

/// Union of note pools over every challenge with `id <= max_id`, sorted.
pub fn unlocked_notes(catalog: &[Challenge], max_id: u32) -> Vec<u8> {
    let mut seen = [false; PITCH_CLASSES];
    for challenge in catalog.iter().filter(|c| c.id <= max_id) {
        for &note in &challenge.note_pool {
            seen[usize::from(note) % PITCH_CLASSES] = true;
        }
    }
    (0..PITCH_CLASSES as u8)
        .filter(|n| seen[usize::from(*n)])
        .collect()
}
