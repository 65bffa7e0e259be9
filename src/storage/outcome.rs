//! Session outcome records for the remote append-only log.
//!
//! The log is write-only from the engine's point of view: records are
//! appended after each applied session and never read back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version for outcome records.
///
/// Increment when the record schema changes in a breaking way.
pub const OUTCOME_SCHEMA_VERSION: u8 = 1;

/// Which kind of session produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeTag {
    Dojo,
    Practice,
    Challenge,
    Exam,
}

impl ModeTag {
    /// Get the tag as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dojo => "dojo",
            Self::Practice => "practice",
            Self::Challenge => "challenge",
            Self::Exam => "exam",
        }
    }
}

/// One appended session outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOutcome {
    /// Schema version for forward compatibility.
    pub v: u8,
    /// When the session was applied.
    pub ts: DateTime<Utc>,
    /// Session kind.
    pub mode: ModeTag,
    /// XP earned.
    pub xp: u32,
    /// Whether the session passed.
    pub passed: bool,
    /// Challenge played, for challenge and exam sessions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge_id: Option<u32>,
}

impl SessionOutcome {
    /// Create an outcome stamped with the current time.
    pub fn new(mode: ModeTag, xp: u32, passed: bool, challenge_id: Option<u32>) -> Self {
        Self::with_timestamp(mode, xp, passed, challenge_id, Utc::now())
    }

    /// Create an outcome with a specific timestamp (for testing).
    pub fn with_timestamp(
        mode: ModeTag,
        xp: u32,
        passed: bool,
        challenge_id: Option<u32>,
        ts: DateTime<Utc>,
    ) -> Self {
        Self {
            v: OUTCOME_SCHEMA_VERSION,
            ts,
            mode,
            xp,
            passed,
            challenge_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_json_shape() {
        let ts = DateTime::parse_from_rfc3339("2026-10-16T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let outcome = SessionOutcome::with_timestamp(ModeTag::Exam, 180, true, Some(50), ts);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["v"], 1);
        assert_eq!(json["mode"], "exam");
        assert_eq!(json["xp"], 180);
        assert_eq!(json["passed"], true);
        assert_eq!(json["challenge_id"], 50);
    }

    #[test]
    fn test_dojo_outcome_omits_challenge() {
        let outcome = SessionOutcome::new(ModeTag::Dojo, 40, false, None);
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(!json.contains("challenge_id"));
        assert_eq!(ModeTag::Dojo.as_str(), "dojo");
    }
}
