//! Observation domain model.
//!
//! # Responsibility
//! - Define the finalized school-visit record and its per-criterion scores.
//! - Own the persisted wire shape (camelCase field names).
//!
//! # Invariants
//! - `Score` only holds values in `1..=5`, including when deserialized.
//! - A `TeacherObservation` is never mutated after the capture workflow
//!   hands it to the record store.
//! - `scores` keys equal the `criterion_id` of their value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Lowest allowed rubric score.
pub const SCORE_MIN: u8 = 1;
/// Highest allowed rubric score.
pub const SCORE_MAX: u8 = 5;

/// Rubric score in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    pub fn new(value: u8) -> Result<Self, ScoreRangeError> {
        if (SCORE_MIN..=SCORE_MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ScoreRangeError(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Score {
    type Error = ScoreRangeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for u8 {
    fn from(value: Score) -> Self {
        value.0
    }
}

/// Raised when a raw value is outside `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreRangeError(pub u8);

impl Display for ScoreRangeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "score {} is outside the allowed range {SCORE_MIN}..={SCORE_MAX}",
            self.0
        )
    }
}

impl Error for ScoreRangeError {}

/// Stable observation identifier.
///
/// New ids are time-ordered UUIDv7 strings; records written before that
/// (millisecond timestamps) are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservationId(String);

impl ObservationId {
    /// Generates a fresh id from the current time.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ObservationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ObservationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Display for ObservationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Score and notes captured for one criterion. Either part may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationScore {
    pub criterion_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
    #[serde(default)]
    pub notes: String,
}

impl ObservationScore {
    /// Creates an empty entry (no score, no notes).
    pub fn empty(criterion_id: impl Into<String>) -> Self {
        Self {
            criterion_id: criterion_id.into(),
            score: None,
            notes: String::new(),
        }
    }
}

/// Finalized observation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherObservation {
    pub id: ObservationId,
    pub teacher_name: String,
    pub school_name: String,
    pub observer_name: String,
    /// Finalization instant, serialized as ISO 8601.
    pub date: DateTime<Utc>,
    /// Keyed by criterion id; may cover only part of the rubric.
    #[serde(default)]
    pub scores: BTreeMap<String, ObservationScore>,
    #[serde(default)]
    pub general_notes: String,
}

impl TeacherObservation {
    /// Returns the score recorded for `criterion_id`, if any.
    pub fn score_for(&self, criterion_id: &str) -> Option<Score> {
        self.scores.get(criterion_id).and_then(|entry| entry.score)
    }

    /// Returns notes recorded for `criterion_id` (empty when none).
    pub fn notes_for(&self, criterion_id: &str) -> &str {
        self.scores
            .get(criterion_id)
            .map_or("", |entry| entry.notes.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{ObservationId, ObservationScore, Score, ScoreRangeError};

    #[test]
    fn score_accepts_only_one_to_five() {
        assert_eq!(Score::new(1).map(Score::value), Ok(1));
        assert_eq!(Score::new(5).map(Score::value), Ok(5));
        assert_eq!(Score::new(0), Err(ScoreRangeError(0)));
        assert_eq!(Score::new(6), Err(ScoreRangeError(6)));
    }

    #[test]
    fn score_deserialization_rejects_out_of_range_values() {
        let ok: ObservationScore =
            serde_json::from_str(r#"{"criterionId":"p1","score":4,"notes":""}"#).unwrap();
        assert_eq!(ok.score, Some(Score::new(4).unwrap()));

        let err = serde_json::from_str::<ObservationScore>(r#"{"criterionId":"p1","score":9}"#);
        assert!(err.is_err());
    }

    #[test]
    fn notes_only_entry_omits_score_on_the_wire() {
        let mut entry = ObservationScore::empty("p2");
        entry.notes = "buen clima".to_string();
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["criterionId"], "p2");
        assert!(json.get("score").is_none());
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(ObservationId::generate(), ObservationId::generate());
    }
}
