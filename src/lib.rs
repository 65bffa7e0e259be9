//! Ear Dojo - Melodic Ear Training
//!
//! Ear Dojo drills recognition of melodic intervals relative to a key
//! center. It generates questions from a fixed curriculum, grades answers
//! through a session state machine, tracks per-interval mastery, and
//! persists learner progress locally with optional remote sync.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod profile;
pub mod storage;
pub mod util;

pub use config::Config;
pub use core::{
    Challenge, Grade, Heatmap, Level, Question, QuestionGenerator, Session, SessionMode,
    SessionPhase, SessionSummary,
};
pub use error::{DojoError, Result};
pub use profile::{ProfileManager, SessionResult, UserStats};
pub use storage::{
    DirectoryRemoteStore, FileProfileStore, IdentityProvider, MemoryProfileStore,
    MemoryRemoteStore, ProfileStore, RemoteStore, StaticIdentity,
};

// CLI commands
pub use cli::{CatalogCommand, DrillCommand, ResetCommand, StatsCommand, SyncCommand};
