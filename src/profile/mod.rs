//! Learner profile, progression, and sync.
//!
//! `UserStats` is the persisted learner profile. All session-driven changes
//! go through [`progression::apply_result`]; [`ProfileManager`] wraps it
//! with persistence and remote reconciliation.

pub mod manager;
pub mod progression;
pub mod stats;
pub mod sync;

pub use manager::ProfileManager;
pub use progression::{apply_result, can_attempt, ProgressChanges, SessionResult};
pub use stats::{level_for_xp, UserStats, MAX_HEARTS, XP_PER_LEVEL};
pub use sync::merge;
