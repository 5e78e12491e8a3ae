//! Snapshot codec
//!
//! Snapshots are encoded as JSON objects. Decoding reads `format_version`
//! from the untyped document first and only then commits to the typed
//! layout, so a newer snapshot is rejected before any of its records are
//! interpreted.

use chrono::NaiveDateTime;
use serde_json::Value;

use super::{RecordCounts, Snapshot};
use crate::error::{DecodeError, EncodeError};

/// Format version written by this build
pub const FORMAT_VERSION: u32 = 1;

/// Newest format version this build can decode
pub const MAX_SUPPORTED_VERSION: u32 = FORMAT_VERSION;

/// Encode a snapshot to bytes
pub fn encode(snapshot: &Snapshot) -> Result<Vec<u8>, EncodeError> {
    Ok(serde_json::to_vec(snapshot)?)
}

/// Decode and version-check a snapshot
pub fn decode(bytes: &[u8]) -> Result<Snapshot, DecodeError> {
    let document = parse_document(bytes)?;
    let version = read_version(&document)?;

    if version > u64::from(MAX_SUPPORTED_VERSION) {
        return Err(DecodeError::UnsupportedVersion {
            found: version,
            supported: MAX_SUPPORTED_VERSION,
        });
    }

    serde_json::from_value(document).map_err(|e| DecodeError::Malformed(e.to_string()))
}

/// Metadata readable from a snapshot without decoding its records
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotSummary {
    pub format_version: u64,
    pub created_at: Option<NaiveDateTime>,
    pub device_info: Option<String>,
    pub counts: RecordCounts,
}

/// Best-effort metadata read
///
/// Unlike [`decode`] this accepts snapshots newer than this build and does
/// not look inside individual records. Only a missing or invalid
/// `format_version` is an error.
pub fn summarize(bytes: &[u8]) -> Result<SnapshotSummary, DecodeError> {
    let document = parse_document(bytes)?;
    let format_version = read_version(&document)?;

    let len = |key: &str| document.get(key).and_then(Value::as_array).map_or(0, Vec::len);

    Ok(SnapshotSummary {
        format_version,
        created_at: document
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok()),
        device_info: document
            .get("device_info")
            .and_then(Value::as_str)
            .map(str::to_string),
        counts: RecordCounts {
            events: len("events"),
            meals: len("meals"),
            tasks: len("tasks"),
            notifications: len("notifications"),
        },
    })
}

fn parse_document(bytes: &[u8]) -> Result<Value, DecodeError> {
    let document: Value =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    if !document.is_object() {
        return Err(DecodeError::Malformed("snapshot is not an object".into()));
    }
    Ok(document)
}

fn read_version(document: &Value) -> Result<u64, DecodeError> {
    let raw = document
        .get("format_version")
        .ok_or_else(|| DecodeError::Malformed("missing field `format_version`".into()))?;

    match raw.as_u64() {
        Some(0) => Err(DecodeError::Malformed(
            "format_version must be at least 1".into(),
        )),
        Some(version) => Ok(version),
        None => Err(DecodeError::Malformed(format!(
            "format_version must be a positive integer, got {}",
            raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        now, DietaryRestriction, Entity, Event, Ingredient, Meal, MealType, NutritionalInfo,
        Subtask, Task, TaskCategory,
    };
    use serde_json::json;

    fn sample_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::new(now(), "planner-backup 0.1.0 (linux x86_64)");

        let mut event = Event::new("Dentist", now());
        event.id = 4;
        snapshot.push(&Entity::Event(event));

        let mut meal = Meal::new("Chili", MealType::Dinner, now());
        meal.ingredients.push(Ingredient {
            name: "Beans".into(),
            quantity: "2".into(),
            unit: "cans".into(),
            is_optional: false,
        });
        meal.nutritional_info = Some(NutritionalInfo {
            calories: 420,
            protein: 21.5,
            fat: 0.1,
            ..Default::default()
        });
        meal.dietary_restrictions = vec![DietaryRestriction::Vegan];
        snapshot.push(&Entity::Meal(meal));

        let mut task = Task::new("Pack lunch", TaskCategory::CookingMealPrep);
        task.subtasks.push(Subtask {
            id: 1,
            title: "Sandwich".into(),
            is_completed: true,
            completed_at: Some(now()),
        });
        snapshot.push(&Entity::Task(task));

        snapshot
    }

    #[test]
    fn test_round_trip_is_stable() {
        let snapshot = sample_snapshot();

        let decoded = decode(&encode(&snapshot).unwrap()).unwrap();
        assert_eq!(decoded, snapshot);

        let again = decode(&encode(&decoded).unwrap()).unwrap();
        assert_eq!(again, decoded);
    }

    #[test]
    fn test_empty_snapshot_round_trip() {
        let snapshot = Snapshot::new(now(), "");
        assert_eq!(decode(&encode(&snapshot).unwrap()).unwrap(), snapshot);
    }

    #[test]
    fn test_newer_version_rejected() {
        let mut document = serde_json::to_value(sample_snapshot()).unwrap();
        document["format_version"] = json!(2);
        // Records a newer build might lay out differently are never looked at
        document["tasks"] = json!("reshaped in v2");

        let bytes = serde_json::to_vec(&document).unwrap();
        match decode(&bytes) {
            Err(DecodeError::UnsupportedVersion { found, supported }) => {
                assert_eq!(found, 2);
                assert_eq!(supported, MAX_SUPPORTED_VERSION);
            }
            other => panic!("expected UnsupportedVersion, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_required_field_is_malformed() {
        let mut document = serde_json::to_value(sample_snapshot()).unwrap();
        document.as_object_mut().unwrap().remove("events");

        let bytes = serde_json::to_vec(&document).unwrap();
        assert!(matches!(decode(&bytes), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_wrong_type_is_not_coerced() {
        let mut document = serde_json::to_value(sample_snapshot()).unwrap();
        document["events"][0]["notification_minutes_before"] = json!("15");
        let bytes = serde_json::to_vec(&document).unwrap();
        assert!(matches!(decode(&bytes), Err(DecodeError::Malformed(_))));

        let mut document = serde_json::to_value(sample_snapshot()).unwrap();
        document["format_version"] = json!("1");
        let bytes = serde_json::to_vec(&document).unwrap();
        assert!(matches!(decode(&bytes), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_version_zero_and_missing_version_are_malformed() {
        let mut document = serde_json::to_value(sample_snapshot()).unwrap();
        document["format_version"] = json!(0);
        let bytes = serde_json::to_vec(&document).unwrap();
        assert!(matches!(decode(&bytes), Err(DecodeError::Malformed(_))));

        document.as_object_mut().unwrap().remove("format_version");
        let bytes = serde_json::to_vec(&document).unwrap();
        assert!(matches!(decode(&bytes), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_notifications_default_to_empty() {
        let mut document = serde_json::to_value(sample_snapshot()).unwrap();
        document.as_object_mut().unwrap().remove("notifications");

        let bytes = serde_json::to_vec(&document).unwrap();
        assert!(decode(&bytes).unwrap().notifications.is_empty());
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(decode(b"\x1f\x8b\x08"), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode(b"[1, 2]"), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_summarize_reads_newer_versions() {
        let snapshot = sample_snapshot();
        let mut document = serde_json::to_value(&snapshot).unwrap();
        document["format_version"] = json!(7);

        let summary = summarize(&serde_json::to_vec(&document).unwrap()).unwrap();
        assert_eq!(summary.format_version, 7);
        assert_eq!(summary.created_at, Some(snapshot.created_at));
        assert_eq!(summary.counts.events, 1);
        assert_eq!(summary.counts.meals, 1);
        assert_eq!(summary.counts.tasks, 1);
        assert_eq!(summary.counts.notifications, 0);
    }
}
