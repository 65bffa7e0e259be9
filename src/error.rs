//! Unified error types for ear-dojo with fail-open philosophy.
//!
//! Nothing in the training engine is fatal. Storage and sync errors are
//! logged and replaced with the best available local state; session actions
//! issued in the wrong phase come back as `InvalidState` for the caller to
//! ignore or surface.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for ear-dojo operations.
#[derive(Error, Debug)]
pub enum DojoError {
    /// I/O errors from profile or outcome log files.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Session action issued in a phase that does not accept it.
    #[error("invalid state: {message}")]
    InvalidState { message: String },

    /// Remote store failures (unreachable, rejected write).
    #[error("remote error: {message}")]
    Remote { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// A challenge id that does not exist in the catalog.
    #[error("unknown challenge: {id}")]
    UnknownChallenge { id: u32 },
}

/// A specialized Result type for ear-dojo operations.
pub type Result<T> = std::result::Result<T, DojoError>;

impl DojoError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a remote store error.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an unknown challenge error.
    pub fn unknown_challenge(id: u32) -> Self {
        Self::UnknownChallenge { id }
    }

    /// Whether the error came from a session phase violation.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }
}

impl From<io::Error> for DojoError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for DojoError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Log the error and continue with a safe value instead of propagating.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }
}
