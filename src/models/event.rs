//! Event model
//!
//! Calendar entries with an optional end time, a category and reminder settings.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::enums::{EventCategory, Priority, Recurrence};
use super::{now, RecordId, UNASSIGNED_ID};

/// A calendar event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Store-assigned identifier
    pub id: RecordId,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// When the event starts (local time)
    pub start_date_time: NaiveDateTime,

    /// When the event ends, if it has a duration
    pub end_date_time: Option<NaiveDateTime>,

    pub category: EventCategory,

    pub priority: Priority,

    pub recurrence: Recurrence,

    pub is_completed: bool,

    /// Whether a reminder is scheduled for this event
    pub notification_enabled: bool,

    /// How long before the start the reminder fires
    pub notification_minutes_before: i32,

    pub created_at: NaiveDateTime,

    pub updated_at: NaiveDateTime,
}

impl Event {
    /// Create a new, not yet stored, event with default settings
    pub fn new(title: impl Into<String>, start_date_time: NaiveDateTime) -> Self {
        let now = now();
        Self {
            id: UNASSIGNED_ID,
            title: title.into(),
            description: String::new(),
            start_date_time,
            end_date_time: None,
            category: EventCategory::Personal,
            priority: Priority::Medium,
            recurrence: Recurrence::None,
            is_completed: false,
            notification_enabled: true,
            notification_minutes_before: 15,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate the event
    pub fn validate(&self) -> Result<(), EventValidationError> {
        if self.title.trim().is_empty() {
            return Err(EventValidationError::EmptyTitle);
        }

        if let Some(end) = self.end_date_time {
            if end < self.start_date_time {
                return Err(EventValidationError::EndsBeforeStart);
            }
        }

        if self.notification_minutes_before < 0 {
            return Err(EventValidationError::NegativeReminder(
                self.notification_minutes_before,
            ));
        }

        Ok(())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.start_date_time.format("%Y-%m-%d %H:%M"))
    }
}

/// Validation errors for events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventValidationError {
    EmptyTitle,
    EndsBeforeStart,
    NegativeReminder(i32),
}

impl fmt::Display for EventValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "Event title cannot be empty"),
            Self::EndsBeforeStart => write!(f, "Event ends before it starts"),
            Self::NegativeReminder(minutes) => {
                write!(f, "Reminder lead time cannot be negative ({} minutes)", minutes)
            }
        }
    }
}

impl std::error::Error for EventValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_new_event_defaults() {
        let event = Event::new("Dentist", start());
        assert_eq!(event.id, UNASSIGNED_ID);
        assert_eq!(event.category, EventCategory::Personal);
        assert_eq!(event.priority, Priority::Medium);
        assert_eq!(event.notification_minutes_before, 15);
        assert!(event.validate().is_ok());
    }

    #[test]
    fn test_end_before_start_rejected() {
        let mut event = Event::new("Standup", start());
        event.end_date_time = Some(start() - Duration::minutes(5));
        assert_eq!(event.validate(), Err(EventValidationError::EndsBeforeStart));
    }

    #[test]
    fn test_blank_title_rejected() {
        let event = Event::new("   ", start());
        assert_eq!(event.validate(), Err(EventValidationError::EmptyTitle));
    }
}
