//! Playback plans and generation-based cancellation.
//!
//! The session never awaits audio itself. It hands out owned plans that
//! capture a [`Ticket`] from the session's [`Generation`] counter. A plan
//! re-checks its ticket after every suspension point (each player call and
//! each delay) and stops as soon as the session has moved on, so an
//! interrupted feedback sequence can never fire a late phase.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::PlaybackConfig;
use crate::core::pitch::Pitch;

/// Playback speed in beats (notes) per minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tempo {
    pub bpm: u32,
}

impl Tempo {
    /// Create a tempo.
    pub fn new(bpm: u32) -> Self {
        Self { bpm }
    }

    /// Length of one note at this tempo.
    pub fn note_duration(&self) -> Duration {
        Duration::from_millis(60_000 / u64::from(self.bpm.max(1)))
    }
}

/// Relative speed a session plays its melodies at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pace {
    Normal,
    /// Used for the hardest tier.
    Fast,
}

/// Audio output capability.
///
/// Both calls resolve once the sound has finished.
pub trait Player {
    /// Play a single pitch for `duration`.
    fn play_tone(&self, pitch: Pitch, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Play pitches one after another at `tempo`.
    fn play_sequence(&self, pitches: &[Pitch], tempo: Tempo) -> impl Future<Output = ()> + Send;
}

/// How a plan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    /// Every phase played.
    Completed,
    /// The session moved on; remaining phases were abandoned.
    Cancelled,
}

/// Monotonic session-local counter; bumping it invalidates all tickets.
#[derive(Debug, Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    /// Create a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value.
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Invalidate every outstanding ticket. Returns the new value.
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Capture the current value.
    pub fn ticket(&self) -> Ticket {
        Ticket {
            generation: self.clone(),
            value: self.current(),
        }
    }
}

/// A captured generation value.
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: Generation,
    value: u64,
}

impl Ticket {
    /// Whether the session is still on the generation this ticket captured.
    pub fn is_live(&self) -> bool {
        self.generation.current() == self.value
    }
}

/// Cadence establishing a key: root, third, fifth, octave.
pub fn cadence(key_center: Pitch) -> Vec<Pitch> {
    [0u8, 4, 7, 12]
        .iter()
        .map(|offset| key_center.saturating_add(*offset))
        .collect()
}

/// Listening phase: cadence, pause, target melody.
#[derive(Debug, Clone)]
pub struct ListenPlan {
    pub cadence: Vec<Pitch>,
    pub melody: Vec<Pitch>,
    pub pace: Pace,
    ticket: Ticket,
}

impl ListenPlan {
    pub(crate) fn new(key_center: Pitch, melody: Vec<Pitch>, pace: Pace, ticket: Ticket) -> Self {
        Self {
            cadence: cadence(key_center),
            melody,
            pace,
            ticket,
        }
    }

    /// Play the plan, stopping early if the session moves on.
    pub async fn play<P: Player>(self, player: &P, timing: &PlaybackConfig) -> Playback {
        let tempo = timing.tempo_for(self.pace);

        if !self.ticket.is_live() {
            return Playback::Cancelled;
        }
        player.play_sequence(&self.cadence, tempo).await;
        if !self.ticket.is_live() {
            return Playback::Cancelled;
        }
        tokio::time::sleep(timing.cadence_gap()).await;
        if !self.ticket.is_live() {
            return Playback::Cancelled;
        }
        player.play_sequence(&self.melody, tempo).await;
        if !self.ticket.is_live() {
            return Playback::Cancelled;
        }
        Playback::Completed
    }
}

/// Wrong-answer feedback: what was played, then the target, then a
/// reference tone on the key center, with pauses between.
#[derive(Debug, Clone)]
pub struct FeedbackPlan {
    pub played: Vec<Pitch>,
    pub target: Vec<Pitch>,
    pub reference: Pitch,
    pub pace: Pace,
    ticket: Ticket,
}

impl FeedbackPlan {
    pub(crate) fn new(
        played: Vec<Pitch>,
        target: Vec<Pitch>,
        reference: Pitch,
        pace: Pace,
        ticket: Ticket,
    ) -> Self {
        Self {
            played,
            target,
            reference,
            pace,
            ticket,
        }
    }

    /// Play the three phases, abandoning the rest on retry/skip/advance.
    pub async fn play<P: Player>(self, player: &P, timing: &PlaybackConfig) -> Playback {
        let tempo = timing.tempo_for(self.pace);
        let gap = timing.feedback_gap();

        if !self.ticket.is_live() {
            return Playback::Cancelled;
        }
        player.play_sequence(&self.played, tempo).await;
        if !self.ticket.is_live() {
            return Playback::Cancelled;
        }
        tokio::time::sleep(gap).await;
        if !self.ticket.is_live() {
            return Playback::Cancelled;
        }
        player.play_sequence(&self.target, tempo).await;
        if !self.ticket.is_live() {
            return Playback::Cancelled;
        }
        tokio::time::sleep(gap).await;
        if !self.ticket.is_live() {
            return Playback::Cancelled;
        }
        player.play_tone(self.reference, timing.tone_duration()).await;
        if !self.ticket.is_live() {
            return Playback::Cancelled;
        }
        Playback::Completed
    }
}

/// Echo a clicked key.
pub async fn echo<P: Player>(player: &P, pitch: Pitch, timing: &PlaybackConfig) {
    player.play_tone(pitch, timing.tone_duration()).await;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// A call made to the recording player.
    #[derive(Debug, Clone, PartialEq)]
    pub enum PlayerCall {
        Tone(Pitch),
        Sequence(Vec<Pitch>),
    }

    /// Player that records calls and waits (on the tokio clock) for as long
    /// as the sound would last.
    #[derive(Debug, Default)]
    pub struct RecordingPlayer {
        calls: Mutex<Vec<PlayerCall>>,
    }

    impl RecordingPlayer {
        pub fn calls(&self) -> Vec<PlayerCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Player for RecordingPlayer {
        async fn play_tone(&self, pitch: Pitch, duration: Duration) {
            self.calls.lock().unwrap().push(PlayerCall::Tone(pitch));
            tokio::time::sleep(duration).await;
        }

        async fn play_sequence(&self, pitches: &[Pitch], tempo: Tempo) {
            self.calls
                .lock()
                .unwrap()
                .push(PlayerCall::Sequence(pitches.to_vec()));
            tokio::time::sleep(tempo.note_duration() * pitches.len() as u32).await;
        }
    }
}
