//! Configuration loading for ear-dojo.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. User config (`~/.ear-dojo/config.toml`)
//! 3. Defaults (lowest priority)
//!
//! All configuration is optional. The system runs with sensible defaults
//! when no config exists.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::playback::{Pace, Tempo};
use crate::error::{DojoError, Result};

/// Slowest accepted tempo.
pub const MIN_TEMPO_BPM: u32 = 30;
/// Fastest accepted tempo.
pub const MAX_TEMPO_BPM: u32 = 300;

/// Main configuration struct for ear-dojo.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Playback timing.
    pub playback: PlaybackConfig,
    /// Session sizing and seeding.
    pub session: SessionConfig,
    /// Remote sync identity and location.
    pub sync: SyncConfig,
}

/// Playback timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Melody tempo for normal pace.
    pub tempo_bpm: u32,
    /// Melody tempo for the hardest tier.
    pub fast_tempo_bpm: u32,
    /// Length of single tones (reference tone, key echo).
    pub tone_ms: u64,
    /// Pause between the cadence and the melody.
    pub cadence_gap_ms: u64,
    /// Pause between wrong-answer feedback phases.
    pub feedback_gap_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tempo_bpm: 100,
            fast_tempo_bpm: 140,
            tone_ms: 800,
            cadence_gap_ms: 700,
            feedback_gap_ms: 600,
        }
    }
}

impl PlaybackConfig {
    /// Check that a tempo is within the accepted range.
    pub fn is_valid_tempo(bpm: u32) -> bool {
        (MIN_TEMPO_BPM..=MAX_TEMPO_BPM).contains(&bpm)
    }

    /// Tempo for a pace.
    pub fn tempo_for(&self, pace: Pace) -> Tempo {
        match pace {
            Pace::Normal => Tempo::new(self.tempo_bpm),
            Pace::Fast => Tempo::new(self.fast_tempo_bpm),
        }
    }

    pub fn tone_duration(&self) -> Duration {
        Duration::from_millis(self.tone_ms)
    }

    pub fn cadence_gap(&self) -> Duration {
        Duration::from_millis(self.cadence_gap_ms)
    }

    pub fn feedback_gap(&self) -> Duration {
        Duration::from_millis(self.feedback_gap_ms)
    }
}

/// Session sizing and seeding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Questions per Dojo session.
    pub dojo_questions: usize,
    /// Questions per Practice batch.
    pub practice_batch: usize,
    /// Fixed seed for reproducible question batches.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dojo_questions: 10,
            practice_batch: 10,
            seed: None,
        }
    }
}

/// Remote sync identity and location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Signed-in user. No user means sync is skipped.
    pub user_id: Option<String>,
    /// Directory backing the remote store.
    pub remote_dir: Option<PathBuf>,
}

impl SyncConfig {
    /// Configured remote directory, or `<home>/remote`.
    pub fn remote_dir(&self) -> Option<PathBuf> {
        self.remote_dir
            .clone()
            .or_else(|| dojo_home().map(|home| home.join("remote")))
    }
}

impl Config {
    /// Load configuration with full precedence chain.
    ///
    /// A missing config file means defaults; an unreadable or malformed one
    /// is an error.
    pub fn load() -> Result<Self> {
        let mut config = match dojo_home().map(|home| home.join("config.toml")) {
            Some(path) if path.exists() => Self::load_from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| DojoError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| DojoError::config(e.to_string()))
    }

    /// Load config with fail-open behavior.
    ///
    /// A broken config file is reported and skipped; environment overrides
    /// still apply on top of the defaults.
    pub fn load_fail_open() -> Self {
        Self::load().unwrap_or_else(|err| {
            tracing::warn!("loading config: {} (fail-open: using defaults)", err);
            let mut config = Self::default();
            config.apply_env_overrides();
            config
        })
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // EAR_DOJO_TEMPO
        if let Some(bpm) = env_tempo("EAR_DOJO_TEMPO", self.playback.tempo_bpm) {
            self.playback.tempo_bpm = bpm;
        }

        // EAR_DOJO_FAST_TEMPO
        if let Some(bpm) = env_tempo("EAR_DOJO_FAST_TEMPO", self.playback.fast_tempo_bpm) {
            self.playback.fast_tempo_bpm = bpm;
        }

        // EAR_DOJO_SEED
        if let Ok(val) = env::var("EAR_DOJO_SEED") {
            match val.parse::<u64>() {
                Ok(seed) => self.session.seed = Some(seed),
                Err(_) => tracing::warn!(
                    "Invalid EAR_DOJO_SEED value '{}'. Expected an unsigned integer. Ignoring.",
                    val
                ),
            }
        }

        // EAR_DOJO_USER
        if let Ok(val) = env::var("EAR_DOJO_USER") {
            let trimmed = val.trim();
            if trimmed.is_empty() {
                self.sync.user_id = None;
            } else {
                self.sync.user_id = Some(trimmed.to_string());
            }
        }

        // EAR_DOJO_REMOTE_DIR
        if let Ok(val) = env::var("EAR_DOJO_REMOTE_DIR") {
            if !val.is_empty() {
                self.sync.remote_dir = Some(PathBuf::from(val));
            }
        }
    }
}

fn env_tempo(name: &str, current: u32) -> Option<u32> {
    let val = env::var(name).ok()?;
    match val.parse::<u32>() {
        Ok(bpm) if PlaybackConfig::is_valid_tempo(bpm) => Some(bpm),
        Ok(bpm) => {
            tracing::warn!(
                "Invalid {} value '{}'. Must be between {} and {}. Using '{}'.",
                name,
                bpm,
                MIN_TEMPO_BPM,
                MAX_TEMPO_BPM,
                current
            );
            None
        }
        Err(_) => {
            tracing::warn!(
                "Invalid {} value '{}'. Expected a positive integer. Using '{}'.",
                name,
                val,
                current
            );
            None
        }
    }
}

/// Get the ear-dojo home directory.
///
/// `EAR_DOJO_HOME` when set and non-empty, else `~/.ear-dojo`, else a
/// per-user directory under `/tmp`.
pub fn dojo_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("EAR_DOJO_HOME") {
        if home.is_empty() {
            tracing::warn!("EAR_DOJO_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("EAR_DOJO_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".ear-dojo"));
    }

    let fallback_path = fallback_dojo_home();
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback_path.display()
    );
    Some(fallback_path)
}

#[cfg(unix)]
fn fallback_dojo_home() -> PathBuf {
    use std::os::unix::fs::MetadataExt;
    let uid = std::fs::metadata("/").map(|m| m.uid()).unwrap_or(0);
    PathBuf::from(format!("/tmp/ear-dojo-{}", uid))
}

#[cfg(not(unix))]
fn fallback_dojo_home() -> PathBuf {
    std::env::temp_dir().join("ear-dojo")
}

/// Path of the local profile file.
pub fn profile_path() -> Option<PathBuf> {
    dojo_home().map(|home| home.join("profile.json"))
}
