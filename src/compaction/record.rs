//! Persisted compaction metadata.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

/// Error raised when a persisted compaction record is malformed.
///
/// A *missing* record is not an error: never-compacted sessions simply
/// have no record, and callers should treat that as "no compaction yet".
/// Corrupt data, on the other hand, must never be trusted.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("malformed compaction record: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("compaction field '{field}' {problem}")]
    InvalidField {
        field: &'static str,
        problem: &'static str,
    },
}

/// Persisted metadata describing the latest context compaction.
///
/// Created on the first successful compaction and chained on subsequent
/// ones: `previous_summary` carries the summary this one superseded, and
/// `compaction_count` grows monotonically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionRecord {
    pub summary: String,
    pub compacted_message_count: usize,
    pub tokens_before: usize,
    pub tokens_after: usize,
    pub compaction_count: u64,
    pub previous_summary: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_compacted_at: OffsetDateTime,
}

impl CompactionRecord {
    /// Serialize the record to its persisted JSON shape.
    ///
    /// # Panics
    /// Never panics for records constructed through this crate; the
    /// timestamp is always RFC 3339 representable.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("compaction record is JSON representable")
    }

    /// Deserialize a record from persisted session JSON.
    ///
    /// Every field is strictly type-checked: booleans or floats where
    /// integers are expected, negative counts, and unparseable timestamps
    /// are all rejected rather than coerced.
    ///
    /// # Errors
    /// Returns [`RecordError`] when any field is missing or ill-typed.
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        // serde_json rejects bools/floats/negatives for the unsigned
        // integer fields and non-RFC-3339 strings for the timestamp.
        let record: Self = serde_json::from_value(value)?;

        if record.compaction_count == 0 {
            return Err(RecordError::InvalidField {
                field: "compaction_count",
                problem: "must be > 0",
            });
        }

        Ok(record)
    }

    /// Deserialize an optional record.
    ///
    /// `None` and JSON `null` both mean "no compaction yet" — legacy
    /// sessions persisted before compaction existed load cleanly.
    ///
    /// # Errors
    /// Returns [`RecordError`] when a present record is malformed.
    pub fn from_optional_value(value: Option<Value>) -> Result<Option<Self>, RecordError> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(present) => Self::from_value(present).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    fn sample_record() -> CompactionRecord {
        CompactionRecord {
            summary: "## Goal\nKeep the refactor moving.".to_string(),
            compacted_message_count: 5,
            tokens_before: 368,
            tokens_after: 120,
            compaction_count: 1,
            previous_summary: None,
            last_compacted_at: datetime!(2026-02-11 00:00:00 UTC),
        }
    }

    #[test]
    fn test_round_trip() {
        let record = sample_record();
        let restored =
            CompactionRecord::from_value(record.to_value()).expect("round trip");
        assert_eq!(restored, record);
    }

    #[test]
    fn test_round_trip_with_chained_summary() {
        let record = CompactionRecord {
            previous_summary: Some("## Goal\nEarlier state.".to_string()),
            compaction_count: 3,
            ..sample_record()
        };
        let restored =
            CompactionRecord::from_value(record.to_value()).expect("round trip");
        assert_eq!(restored, record);
    }

    #[test]
    fn test_persisted_shape_is_field_exact() {
        let value = sample_record().to_value();
        let object = value.as_object().expect("object");
        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "compacted_message_count",
                "compaction_count",
                "last_compacted_at",
                "previous_summary",
                "summary",
                "tokens_after",
                "tokens_before",
            ]
        );
    }

    #[test]
    fn test_rejects_boolean_where_int_expected() {
        let mut value = sample_record().to_value();
        value["tokens_before"] = json!(true);
        assert!(CompactionRecord::from_value(value).is_err());
    }

    #[test]
    fn test_rejects_negative_counts() {
        let mut value = sample_record().to_value();
        value["compacted_message_count"] = json!(-3);
        assert!(CompactionRecord::from_value(value).is_err());
    }

    #[test]
    fn test_rejects_zero_compaction_count() {
        let mut value = sample_record().to_value();
        value["compaction_count"] = json!(0);
        let error = CompactionRecord::from_value(value).expect_err("zero count");
        assert!(error.to_string().contains("compaction_count"));
    }

    #[test]
    fn test_rejects_unparseable_timestamp() {
        let mut value = sample_record().to_value();
        value["last_compacted_at"] = json!("yesterday");
        assert!(CompactionRecord::from_value(value).is_err());
    }

    #[test]
    fn test_rejects_missing_summary() {
        let mut value = sample_record().to_value();
        value.as_object_mut().expect("object").remove("summary");
        assert!(CompactionRecord::from_value(value).is_err());
    }

    #[test]
    fn test_absent_record_means_no_compaction_yet() {
        assert!(CompactionRecord::from_optional_value(None)
            .expect("absent")
            .is_none());
        assert!(CompactionRecord::from_optional_value(Some(Value::Null))
            .expect("null")
            .is_none());
    }
}
