//! Drill command for ear-dojo.
//!
//! Runs one interactive session in the terminal. Answers are typed as note
//! names (`C4 E4 G4`) or MIDI numbers. When the session ends the result is
//! applied to the profile and, if signed in, logged remotely.

use std::io::Write;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::config::Config;
use crate::core::catalog;
use crate::core::{
    echo, parse_pitch, pitch_name, Grade, Level, Pitch, Player, QuestionGenerator, Session,
    SessionMode, SessionPhase, Tempo,
};
use crate::error::{DojoError, Result};
use crate::profile::{can_attempt, ProfileManager, UserStats};
use crate::storage::{IdentityProvider, ModeTag, ProfileStore, RemoteStore};

/// What to drill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DrillTarget {
    #[default]
    Dojo,
    Practice(Level),
    Challenge(u32),
}

/// Options for the drill command.
#[derive(Debug, Clone, Default)]
pub struct DrillOptions {
    /// Output the final result as JSON.
    pub json: bool,
    /// Suppress the final result.
    pub quiet: bool,
    pub target: DrillTarget,
    /// Draw only from weak spots.
    pub force_weak: bool,
}

/// Output format for the drill command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrillOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ModeTag>,
    pub xp_gained: u32,
    pub max_xp: u32,
    pub passed: bool,
    pub mistakes: u32,
    pub level: u32,
    pub levelled_up: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlocked: Option<u32>,
    pub new_high_score: bool,
    pub hearts: u8,
    pub streak: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DrillOutput {
    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Player that prints instead of sounding, taking as long as the audio would.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPlayer {
    /// Print note names instead of one mark per note.
    pub show_notes: bool,
    /// Print nothing.
    pub silent: bool,
}

impl TerminalPlayer {
    fn render(&self, pitches: &[Pitch]) {
        if self.silent {
            return;
        }
        let shown: Vec<String> = pitches
            .iter()
            .map(|&p| {
                if self.show_notes {
                    pitch_name(p)
                } else {
                    "♪".to_string()
                }
            })
            .collect();
        println!("  {}", shown.join(" "));
    }
}

impl Player for TerminalPlayer {
    async fn play_tone(&self, pitch: Pitch, duration: std::time::Duration) {
        self.render(&[pitch]);
        tokio::time::sleep(duration).await;
    }

    async fn play_sequence(&self, pitches: &[Pitch], tempo: Tempo) {
        self.render(pitches);
        tokio::time::sleep(tempo.note_duration() * pitches.len() as u32).await;
    }
}

/// The drill command implementation.
pub struct DrillCommand<S: ProfileStore, I: IdentityProvider, R: RemoteStore> {
    manager: ProfileManager<S>,
    identity: I,
    remote: R,
    config: Config,
}

impl<S: ProfileStore, I: IdentityProvider, R: RemoteStore> DrillCommand<S, I, R> {
    /// Create a new drill command.
    pub fn new(manager: ProfileManager<S>, identity: I, remote: R, config: Config) -> Self {
        Self {
            manager,
            identity,
            remote,
            config,
        }
    }

    /// Run one session, reading answers from `input` and writing prompts to
    /// `out`.
    pub async fn run<P, In, W>(
        &self,
        player: &P,
        input: In,
        out: &mut W,
        options: &DrillOptions,
    ) -> DrillOutput
    where
        P: Player,
        In: AsyncBufRead + Unpin,
        W: Write,
    {
        match self.run_session(player, input, out, options).await {
            Ok(output) => output,
            Err(e) => DrillOutput::failure(e.to_string()),
        }
    }

    async fn run_session<P, In, W>(
        &self,
        player: &P,
        input: In,
        out: &mut W,
        options: &DrillOptions,
    ) -> Result<DrillOutput>
    where
        P: Player,
        In: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut stats = self.manager.load();
        let mode = self.resolve(options.target, &stats)?;
        let count = match options.target {
            DrillTarget::Practice(_) => self.config.session.practice_batch,
            _ => self.config.session.dojo_questions,
        };
        let generator =
            QuestionGenerator::with_seed(self.manager.catalog().to_vec(), self.config.session.seed);
        let mut session = Session::new(mode, generator, &stats, count, options.force_weak);
        let timing = &self.config.playback;
        let mut lines = input.lines();

        session.begin()?;
        writeln!(
            out,
            "Enter notes (C4 E4 or 60 64). '<' deletes, 'r' replays, 's' skips, 'q' ends."
        )?;

        loop {
            match session.phase() {
                SessionPhase::Listening => {
                    if let Some(question) = session.current_question() {
                        writeln!(
                            out,
                            "\nQuestion {}/{}: {}",
                            session.question_index() + 1,
                            session.question_count(),
                            question.description
                        )?;
                    }
                    session.listen(player, timing).await?;
                }
                SessionPhase::Answering => {
                    let Some(line) = lines.next_line().await? else {
                        session.end()?;
                        continue;
                    };
                    self.answer(&mut session, &mut stats, player, &line, out)
                        .await?;
                }
                SessionPhase::Wrong => {
                    let plan = session.feedback_plan()?;
                    let interrupted = tokio::select! {
                        line = lines.next_line() => Some(line?),
                        _ = plan.play(player, timing) => None,
                    };
                    let line = match interrupted {
                        Some(line) => line,
                        None => lines.next_line().await?,
                    };

                    match line.as_deref().map(str::trim) {
                        None | Some("q") | Some("quit") => {
                            session.end()?;
                        }
                        Some("s") | Some("skip") | Some("n") | Some("next") => {
                            session.next(&mut stats)?;
                        }
                        Some(answer) => {
                            session.retry()?;
                            if !answer.is_empty() {
                                self.answer(&mut session, &mut stats, player, answer, out)
                                    .await?;
                            }
                        }
                    }
                }
                SessionPhase::Correct => session.next(&mut stats)?,
                SessionPhase::Summary | SessionPhase::Idle | SessionPhase::Advancing => break,
            }
        }

        let mistakes = session.summary().map(|s| s.mistakes).unwrap_or_default();
        let result = session.finish()?;
        let changes = self
            .manager
            .apply_result(&mut stats, &result, Local::now().date_naive());
        self.manager
            .record_outcome(&self.identity, &self.remote, session.mode().tag(), &result);

        Ok(DrillOutput {
            success: true,
            mode: Some(session.mode().tag()),
            xp_gained: result.xp_gained,
            max_xp: result.max_xp,
            passed: result.passed,
            mistakes,
            level: stats.level,
            levelled_up: changes.levelled_up(),
            unlocked: changes.unlocked,
            new_high_score: changes.new_high_score,
            hearts: stats.hearts,
            streak: stats.streak,
            error: None,
        })
    }

    fn resolve(&self, target: DrillTarget, stats: &UserStats) -> Result<SessionMode> {
        match target {
            DrillTarget::Dojo => Ok(SessionMode::Dojo),
            DrillTarget::Practice(level) => Ok(SessionMode::Practice(level)),
            DrillTarget::Challenge(id) => {
                let challenge = catalog::find(self.manager.catalog(), id)
                    .ok_or_else(|| DojoError::unknown_challenge(id))?;
                if !can_attempt(stats, challenge) {
                    return Err(DojoError::invalid_state(format!(
                        "Challenge {} is locked",
                        id
                    )));
                }
                Ok(SessionMode::Challenge(challenge.clone()))
            }
        }
    }

    /// Handle one line typed while answering.
    async fn answer<P: Player, W: Write>(
        &self,
        session: &mut Session,
        stats: &mut UserStats,
        player: &P,
        line: &str,
        out: &mut W,
    ) -> Result<()> {
        match line.trim() {
            "q" | "quit" => {
                session.end()?;
                return Ok(());
            }
            "r" | "replay" => return session.replay(),
            "s" | "skip" => return session.skip(stats),
            "<" | "back" => {
                if let Err(e) = session.backspace() {
                    writeln!(out, "{}", e)?;
                }
                return Ok(());
            }
            _ => {}
        }

        for token in line.split_whitespace() {
            match parse_pitch(token) {
                Some(pitch) => {
                    if session.click(pitch)? {
                        echo(player, pitch, &self.config.playback).await;
                    }
                }
                None => writeln!(out, "Unknown note '{}'", token)?,
            }
        }

        let target_len = session.current_question().map_or(0, |q| q.len());
        if session.input().len() < target_len {
            writeln!(out, "{} of {} notes", session.input().len(), target_len)?;
            return Ok(());
        }

        match session.check(stats)? {
            Grade::Correct { xp_awarded } => {
                writeln!(out, "Correct! +{} XP", xp_awarded)?;
            }
            Grade::Wrong { mismatches, revealed } => {
                if let Some(comparison) = session.comparison() {
                    let played: Vec<String> = comparison
                        .played
                        .iter()
                        .enumerate()
                        .map(|(i, &p)| {
                            if mismatches.contains(&i) {
                                format!("[{}]", pitch_name(p))
                            } else {
                                pitch_name(p)
                            }
                        })
                        .collect();
                    writeln!(out, "Not quite: {}", played.join(" "))?;
                    if revealed {
                        let target: Vec<String> =
                            comparison.target.iter().map(|&p| pitch_name(p)).collect();
                        writeln!(out, "Answer: {}", target.join(" "))?;
                    }
                }
                writeln!(out, "Type a new answer to retry, 's' to skip.")?;
            }
            Grade::Recorded => {
                writeln!(out, "Recorded.")?;
            }
        }
        Ok(())
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &DrillOutput, options: &DrillOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            return serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string());
        }

        if !output.success {
            return format!(
                "Drill failed: {}",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = vec![
            String::new(),
            format!(
                "{}: {} / {} XP",
                if output.passed { "Passed" } else { "Not passed" },
                output.xp_gained,
                output.max_xp
            ),
        ];
        if output.levelled_up {
            lines.push(format!("Level up! Now level {}", output.level));
        }
        if let Some(id) = output.unlocked {
            lines.push(format!("Unlocked challenge #{}", id));
        }
        if output.new_high_score {
            lines.push("New high score!".to_string());
        }
        lines.push(format!(
            "Hearts {} | Streak {}",
            output.hearts, output.streak
        ));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::core::Question;
    use crate::profile::MAX_HEARTS;
    use crate::storage::{MemoryProfileStore, MemoryRemoteStore, StaticIdentity};
    use std::sync::Arc;

    const SEED: u64 = 21;

    struct Fixture {
        store: Arc<MemoryProfileStore>,
        remote: Arc<MemoryRemoteStore>,
        command: DrillCommand<Arc<MemoryProfileStore>, StaticIdentity, Arc<MemoryRemoteStore>>,
    }

    fn fixture(identity: StaticIdentity) -> Fixture {
        let store = Arc::new(MemoryProfileStore::new());
        let remote = Arc::new(MemoryRemoteStore::new());
        let config = Config {
            session: SessionConfig {
                dojo_questions: 3,
                practice_batch: 3,
                seed: Some(SEED),
            },
            ..Config::default()
        };
        let command = DrillCommand::new(
            ProfileManager::new(Arc::clone(&store), catalog::generate()),
            identity,
            Arc::clone(&remote),
            config,
        );
        Fixture {
            store,
            remote,
            command,
        }
    }

    fn challenge_questions(id: u32) -> Vec<Question> {
        let catalog = catalog::generate();
        let challenge = catalog::find(&catalog, id).unwrap().clone();
        QuestionGenerator::seeded(catalog, SEED).challenge(&challenge)
    }

    fn answers(questions: &[Question]) -> String {
        questions
            .iter()
            .map(|q| {
                let notes: Vec<String> = q.target_melody.iter().map(|p| p.to_string()).collect();
                notes.join(" ") + "\n"
            })
            .collect()
    }

    fn options(target: DrillTarget) -> DrillOptions {
        DrillOptions {
            target,
            ..DrillOptions::default()
        }
    }

    async fn drill(fixture: &Fixture, target: DrillTarget, input: &str) -> (DrillOutput, String) {
        let mut out = Vec::new();
        let player = TerminalPlayer {
            silent: true,
            ..TerminalPlayer::default()
        };
        let output = fixture
            .command
            .run(&player, input.as_bytes(), &mut out, &options(target))
            .await;
        (output, String::from_utf8(out).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_passing_challenge_unlocks_next() {
        let fixture = fixture(StaticIdentity::user("ren"));
        let questions = challenge_questions(1);
        let max_xp: u32 = questions.iter().map(|q| q.len() as u32 * 10).sum();

        let (output, transcript) = drill(&fixture, DrillTarget::Challenge(1), &answers(&questions)).await;

        assert!(output.success, "{:?}", output.error);
        assert!(output.passed);
        assert_eq!(output.xp_gained, max_xp);
        assert_eq!(output.max_xp, max_xp);
        assert_eq!(output.unlocked, Some(2));
        assert!(output.new_high_score);
        assert!(transcript.contains("Correct!"));

        let saved = fixture.store.snapshot().unwrap();
        assert!(saved.is_unlocked(2));
        assert_eq!(saved.high_score(1), Some(max_xp));

        let outcomes = fixture.remote.outcomes("ren");
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].mode, ModeTag::Challenge);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skipping_everything_costs_a_heart() {
        let fixture = fixture(StaticIdentity::anonymous());
        let questions = challenge_questions(1);
        let input = "s\n".repeat(questions.len());

        let (output, _) = drill(&fixture, DrillTarget::Challenge(1), &input).await;

        assert!(output.success);
        assert!(!output.passed);
        assert_eq!(output.mistakes, questions.len() as u32);
        assert_eq!(output.hearts, MAX_HEARTS - 1);
        assert!(output.unlocked.is_none());
        assert!(fixture.store.snapshot().unwrap().heatmap.average() < 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_answer_then_skip() {
        let fixture = fixture(StaticIdentity::anonymous());
        let questions = challenge_questions(1);
        let mut wrong = questions[0].target_melody.clone();
        wrong[0] += 1;
        let wrong_line: Vec<String> = wrong.iter().map(|p| p.to_string()).collect();
        let input = format!("{}\ns\nq\n", wrong_line.join(" "));

        let (output, transcript) = drill(&fixture, DrillTarget::Challenge(1), &input).await;

        assert!(output.success);
        assert!(transcript.contains("Not quite"));
        assert_eq!(output.mistakes, 2);
        assert_eq!(output.xp_gained, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_eof_ends_practice() {
        let fixture = fixture(StaticIdentity::anonymous());

        let (output, _) = drill(&fixture, DrillTarget::Practice(Level::Beginner), "").await;

        assert!(output.success);
        assert_eq!(output.mode, Some(ModeTag::Practice));
        assert_eq!(output.max_xp, 0);
        assert!(!output.passed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_locked_challenge_rejected() {
        let fixture = fixture(StaticIdentity::anonymous());

        let (output, _) = drill(&fixture, DrillTarget::Challenge(5), "").await;

        assert!(!output.success);
        assert!(output.error.unwrap().contains("locked"));
        assert!(fixture.store.snapshot().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_challenge_rejected() {
        let fixture = fixture(StaticIdentity::anonymous());

        let (output, _) = drill(&fixture, DrillTarget::Challenge(9999), "").await;

        assert!(!output.success);
    }

    #[test]
    fn test_format_output() {
        let fixture = fixture(StaticIdentity::anonymous());
        let output = DrillOutput {
            success: true,
            xp_gained: 90,
            max_xp: 100,
            passed: true,
            unlocked: Some(2),
            ..DrillOutput::default()
        };

        let text = fixture
            .command
            .format_output(&output, &DrillOptions::default());

        assert!(text.contains("Passed: 90 / 100 XP"));
        assert!(text.contains("Unlocked challenge #2"));
        assert!(fixture
            .command
            .format_output(&DrillOutput::failure("boom"), &DrillOptions::default())
            .contains("boom"));
    }
}
