//! Drill session state machine.
//!
//! ```text
//! Idle → Listening → Answering → {Correct, Wrong} → Advancing → (Listening | Summary) → Idle
//! ```
//!
//! A session owns its question batch and a [`Generation`] counter. Every
//! retry, skip, replay, advance, and early end bumps the counter, which
//! invalidates any listen or feedback plan still playing. The learner's
//! heatmap is only mutated here, synchronously, inside `check`, `skip`, and
//! `next`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::PlaybackConfig;
use crate::core::catalog::{Challenge, Level};
use crate::core::pitch::{interval_of, Pitch};
use crate::core::playback::{FeedbackPlan, Generation, ListenPlan, Pace, Playback, Player};
use crate::core::question::{Question, QuestionGenerator};
use crate::error::{DojoError, Result};
use crate::profile::{SessionResult, UserStats};
use crate::storage::ModeTag;

/// XP per correctly identified note, first attempt only.
pub const XP_PER_NOTE: u32 = 10;

/// Passing requires `xp * PASS_DENOMINATOR >= max * PASS_NUMERATOR` (80%).
pub const PASS_NUMERATOR: u64 = 4;
pub const PASS_DENOMINATOR: u64 = 5;

/// Cumulative wrong attempts after which the answer is revealed.
pub const REVEAL_AFTER_WRONG: u32 = 3;

/// What the session drills.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionMode {
    /// Single notes from unlocked material.
    Dojo,
    /// Endless batches at a fixed difficulty.
    Practice(Level),
    /// A catalog challenge or exam.
    Challenge(Challenge),
}

impl SessionMode {
    /// Whether answers are graded silently with no retry.
    pub fn is_exam(&self) -> bool {
        matches!(self, SessionMode::Challenge(c) if c.is_exam)
    }

    /// Catalog id, for challenge sessions.
    pub fn challenge_id(&self) -> Option<u32> {
        match self {
            SessionMode::Challenge(c) => Some(c.id),
            _ => None,
        }
    }

    /// Tag used in the outcome log.
    pub fn tag(&self) -> ModeTag {
        match self {
            SessionMode::Dojo => ModeTag::Dojo,
            SessionMode::Practice(_) => ModeTag::Practice,
            SessionMode::Challenge(c) if c.is_exam => ModeTag::Exam,
            SessionMode::Challenge(_) => ModeTag::Challenge,
        }
    }

    /// Melody speed: fast at the hardest tier.
    pub fn pace(&self) -> Pace {
        let level = match self {
            SessionMode::Dojo => Level::Beginner,
            SessionMode::Practice(level) => *level,
            SessionMode::Challenge(c) => c.level,
        };
        if level == Level::Master {
            Pace::Fast
        } else {
            Pace::Normal
        }
    }
}

/// Where the session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Listening,
    Answering,
    Correct,
    Wrong,
    /// Transient; never observable between actions.
    Advancing,
    Summary,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Idle => "Idle",
            SessionPhase::Listening => "Listening",
            SessionPhase::Answering => "Answering",
            SessionPhase::Correct => "Correct",
            SessionPhase::Wrong => "Wrong",
            SessionPhase::Advancing => "Advancing",
            SessionPhase::Summary => "Summary",
        };
        f.write_str(name)
    }
}

/// Outcome of `check`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grade {
    Correct { xp_awarded: u32 },
    Wrong { mismatches: Vec<usize>, revealed: bool },
    /// Exam answers are recorded without feedback.
    Recorded,
}

/// Played-versus-target overlay shown after a wrong answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub played: Vec<Pitch>,
    pub target: Vec<Pitch>,
    /// Positions where `played` differs from `target`.
    pub mismatches: Vec<usize>,
    /// Whether the target may be shown.
    pub revealed: bool,
}

/// End-of-session totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub xp_gained: u32,
    pub max_potential_xp: u32,
    pub passed: bool,
    pub mistakes: u32,
    pub questions_completed: usize,
    pub challenge_id: Option<u32>,
}

impl SessionSummary {
    /// The record handed to progression.
    pub fn result(&self) -> SessionResult {
        SessionResult {
            xp_gained: self.xp_gained,
            passed: self.passed,
            max_xp: self.max_potential_xp,
            challenge_id: self.challenge_id,
        }
    }
}

/// Whether `xp` reaches the pass threshold of `max`. Zero `max` never passes.
pub fn is_passing(xp: u32, max: u32) -> bool {
    max > 0 && u64::from(xp) * PASS_DENOMINATOR >= u64::from(max) * PASS_NUMERATOR
}

/// One drill run.
pub struct Session {
    mode: SessionMode,
    generator: QuestionGenerator,
    questions: Vec<Question>,
    batch_size: usize,
    force_weak: bool,
    index: usize,
    phase: SessionPhase,
    input: Vec<Pitch>,
    xp_gained: u32,
    max_potential_xp: u32,
    mistakes: u32,
    completed: usize,
    wrong_attempts: u32,
    comparison: Option<Comparison>,
    generation: Generation,
    summary: Option<SessionSummary>,
    finished: bool,
}

impl Session {
    /// Build a session and its first batch. `count` is ignored for
    /// challenges, which use the catalog's task count.
    pub fn new(
        mode: SessionMode,
        mut generator: QuestionGenerator,
        stats: &UserStats,
        count: usize,
        force_weak: bool,
    ) -> Self {
        let questions = match &mode {
            SessionMode::Dojo => generator.dojo(stats, count, force_weak),
            SessionMode::Practice(level) => generator.practice(*level, stats, count, force_weak),
            SessionMode::Challenge(challenge) => generator.challenge(challenge),
        };

        Self {
            batch_size: questions.len(),
            mode,
            generator,
            questions,
            force_weak,
            index: 0,
            phase: SessionPhase::Idle,
            input: Vec::new(),
            xp_gained: 0,
            max_potential_xp: 0,
            mistakes: 0,
            completed: 0,
            wrong_attempts: 0,
            comparison: None,
            generation: Generation::new(),
            summary: None,
            finished: false,
        }
    }

    pub fn mode(&self) -> &SessionMode {
        &self.mode
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The active question, if any remain.
    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            SessionPhase::Summary | SessionPhase::Advancing => None,
            _ if self.finished => None,
            _ => self.questions.get(self.index),
        }
    }

    /// Zero-based position within the current batch.
    pub fn question_index(&self) -> usize {
        self.index
    }

    /// Size of the current batch.
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn input(&self) -> &[Pitch] {
        &self.input
    }

    pub fn xp_gained(&self) -> u32 {
        self.xp_gained
    }

    pub fn mistakes(&self) -> u32 {
        self.mistakes
    }

    /// Wrong attempts on the current question.
    pub fn wrong_attempts(&self) -> u32 {
        self.wrong_attempts
    }

    /// The overlay for the current wrong answer.
    pub fn comparison(&self) -> Option<&Comparison> {
        self.comparison.as_ref()
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    /// Counter shared with outstanding playback plans.
    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Idle → Listening.
    pub fn begin(&mut self) -> Result<()> {
        self.expect_phase(&[SessionPhase::Idle], "begin")?;
        if self.finished || self.questions.is_empty() {
            return Err(DojoError::invalid_state("Cannot begin a session with no questions"));
        }
        self.phase = SessionPhase::Listening;
        tracing::debug!(mode = ?self.mode.tag(), questions = self.questions.len(), "session started");
        Ok(())
    }

    /// The playback for the Listening phase. May be requested repeatedly.
    pub fn listen_plan(&self) -> Result<ListenPlan> {
        self.expect_phase(&[SessionPhase::Listening], "listen")?;
        let question = self.active()?;
        Ok(ListenPlan::new(
            question.key_center,
            question.target_melody.clone(),
            self.mode.pace(),
            self.generation.ticket(),
        ))
    }

    /// Listening → Answering, once the melody has played.
    pub fn open_input(&mut self) -> Result<()> {
        self.expect_phase(&[SessionPhase::Listening], "open input")?;
        self.phase = SessionPhase::Answering;
        Ok(())
    }

    /// Play the listen plan and open input when it completes.
    pub async fn listen<P: Player>(&mut self, player: &P, timing: &PlaybackConfig) -> Result<Playback> {
        let plan = self.listen_plan()?;
        let outcome = plan.play(player, timing).await;
        if outcome == Playback::Completed && self.phase == SessionPhase::Listening {
            self.open_input()?;
        }
        Ok(outcome)
    }

    /// Answering → Listening, keeping the input entered so far.
    pub fn replay(&mut self) -> Result<()> {
        self.expect_phase(&[SessionPhase::Answering], "replay")?;
        self.generation.advance();
        self.phase = SessionPhase::Listening;
        Ok(())
    }

    /// Append a note. Returns `false` once the input is full.
    pub fn click(&mut self, pitch: Pitch) -> Result<bool> {
        self.expect_phase(&[SessionPhase::Answering], "enter a note")?;
        let target_len = self.active()?.len();
        if self.input.len() >= target_len {
            return Ok(false);
        }
        self.input.push(pitch);
        Ok(true)
    }

    /// Remove the last note. Not available in exams.
    pub fn backspace(&mut self) -> Result<Option<Pitch>> {
        self.expect_phase(&[SessionPhase::Answering], "delete a note")?;
        if self.mode.is_exam() {
            return Err(DojoError::invalid_state("Cannot delete notes during an exam"));
        }
        Ok(self.input.pop())
    }

    /// Grade the input. Requires a full-length answer.
    pub fn check(&mut self, stats: &mut UserStats) -> Result<Grade> {
        self.expect_phase(&[SessionPhase::Answering], "check")?;
        let question = self.active()?.clone();
        if self.input.len() != question.len() {
            return Err(DojoError::invalid_state(format!(
                "Cannot check {} of {} notes",
                self.input.len(),
                question.len()
            )));
        }

        let mismatches: Vec<usize> = question
            .target_melody
            .iter()
            .zip(&self.input)
            .enumerate()
            .filter(|(_, (target, played))| target != played)
            .map(|(i, _)| i)
            .collect();
        let correct = mismatches.is_empty();

        if correct {
            for &note in &question.target_melody {
                stats.heatmap.update(interval_of(note, question.key_center), true);
            }
        } else {
            for &i in &mismatches {
                let note = question.target_melody[i];
                stats.heatmap.update(interval_of(note, question.key_center), false);
            }
        }

        let earned = XP_PER_NOTE * question.len() as u32;

        if self.mode.is_exam() {
            if correct {
                self.xp_gained += earned;
            } else {
                self.mistakes += 1;
            }
            tracing::debug!(index = self.index, correct, "exam answer recorded");
            self.advance(stats);
            return Ok(Grade::Recorded);
        }

        if correct {
            let xp_awarded = if self.wrong_attempts == 0 { earned } else { 0 };
            self.xp_gained += xp_awarded;
            self.comparison = None;
            self.phase = SessionPhase::Correct;
            tracing::debug!(index = self.index, xp_awarded, "answer correct");
            return Ok(Grade::Correct { xp_awarded });
        }

        self.mistakes += 1;
        self.wrong_attempts += 1;
        let revealed = self.wrong_attempts >= REVEAL_AFTER_WRONG;
        self.comparison = Some(Comparison {
            played: self.input.clone(),
            target: question.target_melody.clone(),
            mismatches: mismatches.clone(),
            revealed,
        });
        self.phase = SessionPhase::Wrong;
        tracing::debug!(index = self.index, attempts = self.wrong_attempts, revealed, "answer wrong");
        Ok(Grade::Wrong { mismatches, revealed })
    }

    /// Wrong-answer playback: played melody, target melody, reference tone.
    pub fn feedback_plan(&self) -> Result<FeedbackPlan> {
        self.expect_phase(&[SessionPhase::Wrong], "play feedback")?;
        let question = self.active()?;
        Ok(FeedbackPlan::new(
            self.input.clone(),
            question.target_melody.clone(),
            question.key_center,
            self.mode.pace(),
            self.generation.ticket(),
        ))
    }

    /// Wrong → Answering with cleared input.
    pub fn retry(&mut self) -> Result<()> {
        self.expect_phase(&[SessionPhase::Wrong], "retry")?;
        self.generation.advance();
        self.input.clear();
        self.comparison = None;
        self.phase = SessionPhase::Answering;
        Ok(())
    }

    /// Move on. From Wrong this is a skip.
    pub fn next(&mut self, stats: &mut UserStats) -> Result<()> {
        match self.phase {
            SessionPhase::Correct => {
                self.advance(stats);
                Ok(())
            }
            SessionPhase::Wrong => self.skip(stats),
            _ => Err(DojoError::invalid_state(format!(
                "Cannot continue in {} phase",
                self.phase
            ))),
        }
    }

    /// Give up on the current question: a mistake plus a negative update for
    /// every target note.
    pub fn skip(&mut self, stats: &mut UserStats) -> Result<()> {
        self.expect_phase(
            &[SessionPhase::Listening, SessionPhase::Answering, SessionPhase::Wrong],
            "skip",
        )?;
        let question = self.active()?;
        for &note in &question.target_melody {
            stats.heatmap.update(interval_of(note, question.key_center), false);
        }
        self.mistakes += 1;
        tracing::debug!(index = self.index, "question skipped");
        self.advance(stats);
        Ok(())
    }

    /// Close the session early, summarizing graded questions only.
    pub fn end(&mut self) -> Result<&SessionSummary> {
        self.expect_phase(
            &[
                SessionPhase::Listening,
                SessionPhase::Answering,
                SessionPhase::Correct,
                SessionPhase::Wrong,
            ],
            "end",
        )?;
        if matches!(self.phase, SessionPhase::Correct | SessionPhase::Wrong) {
            self.complete_current();
        }
        self.generation.advance();
        self.input.clear();
        self.comparison = None;
        Ok(self.close())
    }

    /// Summary → Idle, handing back the result for progression.
    pub fn finish(&mut self) -> Result<SessionResult> {
        self.expect_phase(&[SessionPhase::Summary], "finish")?;
        let summary = self
            .summary
            .as_ref()
            .ok_or_else(|| DojoError::invalid_state("Session has no summary"))?;
        let result = summary.result();
        self.finished = true;
        self.phase = SessionPhase::Idle;
        tracing::debug!(xp = result.xp_gained, passed = result.passed, "session finished");
        Ok(result)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn expect_phase(&self, allowed: &[SessionPhase], action: &str) -> Result<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(DojoError::invalid_state(format!(
                "Cannot {} in {} phase",
                action, self.phase
            )))
        }
    }

    fn active(&self) -> Result<&Question> {
        self.questions
            .get(self.index)
            .ok_or_else(|| DojoError::invalid_state("No active question"))
    }

    fn complete_current(&mut self) {
        if let Some(question) = self.questions.get(self.index) {
            self.max_potential_xp += XP_PER_NOTE * question.len() as u32;
            self.completed += 1;
        }
    }

    fn advance(&mut self, stats: &UserStats) {
        self.phase = SessionPhase::Advancing;
        self.generation.advance();
        self.complete_current();
        self.input.clear();
        self.comparison = None;
        self.wrong_attempts = 0;

        if self.index + 1 < self.questions.len() {
            self.index += 1;
            self.phase = SessionPhase::Listening;
            return;
        }

        if let SessionMode::Practice(level) = self.mode {
            self.questions =
                self.generator
                    .practice(level, stats, self.batch_size, self.force_weak);
            self.index = 0;
            self.phase = SessionPhase::Listening;
            tracing::debug!(batch = self.batch_size, "practice batch regenerated");
            return;
        }

        self.close();
    }

    fn close(&mut self) -> &SessionSummary {
        let summary = SessionSummary {
            xp_gained: self.xp_gained,
            max_potential_xp: self.max_potential_xp,
            passed: is_passing(self.xp_gained, self.max_potential_xp),
            mistakes: self.mistakes,
            questions_completed: self.completed,
            challenge_id: self.mode.challenge_id(),
        };
        tracing::debug!(
            xp = summary.xp_gained,
            max = summary.max_potential_xp,
            passed = summary.passed,
            "session summary"
        );
        self.phase = SessionPhase::Summary;
        self.summary.insert(summary)
    }
}
