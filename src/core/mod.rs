//! Core types and logic for ear-dojo.
//!
//! This module contains the curriculum catalog, the mastery heatmap,
//! question generation, the drill session state machine, and cancellable
//! playback plans.

pub mod catalog;
pub mod heatmap;
pub mod pitch;
pub mod playback;
pub mod question;
pub mod session;

pub use catalog::{Challenge, Level, OctaveRange};
pub use heatmap::Heatmap;
pub use pitch::{interval_name, interval_of, parse_pitch, pitch_name, Pitch};
pub use playback::{
    echo, FeedbackPlan, Generation, ListenPlan, Pace, Playback, Player, Tempo, Ticket,
};
pub use question::{PracticeSettings, Question, QuestionGenerator};
pub use session::{
    Comparison, Grade, Session, SessionMode, SessionPhase, SessionSummary, REVEAL_AFTER_WRONG,
    XP_PER_NOTE,
};
