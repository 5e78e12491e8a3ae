//! Notification model
//!
//! Scheduled reminders derived from events, meals and tasks, plus their
//! delivery state.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::enums::{NotificationActionType, NotificationPriority, NotificationType};
use super::{now, RecordId, UNASSIGNED_ID};

/// A button shown on a delivered notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub id: String,
    pub title: String,
    pub action_type: NotificationActionType,
}

/// A scheduled reminder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Store-assigned identifier
    pub id: RecordId,

    pub title: String,

    pub message: String,

    pub notification_type: NotificationType,

    /// Id of the event, meal or task this reminder belongs to
    pub related_item_id: i64,

    pub scheduled_date_time: NaiveDateTime,

    pub is_delivered: bool,
    pub delivered_at: Option<NaiveDateTime>,

    pub is_dismissed: bool,
    pub dismissed_at: Option<NaiveDateTime>,

    pub is_snoozed: bool,
    pub snooze_until: Option<NaiveDateTime>,

    pub sound_enabled: bool,
    pub vibration_enabled: bool,
    pub led_enabled: bool,

    pub priority: NotificationPriority,

    #[serde(default)]
    pub actions: Vec<NotificationAction>,

    pub created_at: NaiveDateTime,
}

impl Notification {
    /// Create a new, not yet stored, notification
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        notification_type: NotificationType,
        related_item_id: i64,
        scheduled: NaiveDateTime,
    ) -> Self {
        Self {
            id: UNASSIGNED_ID,
            title: title.into(),
            message: message.into(),
            notification_type,
            related_item_id,
            scheduled_date_time: scheduled,
            is_delivered: false,
            delivered_at: None,
            is_dismissed: false,
            dismissed_at: None,
            is_snoozed: false,
            snooze_until: None,
            sound_enabled: true,
            vibration_enabled: true,
            led_enabled: true,
            priority: NotificationPriority::Default,
            actions: Vec::new(),
            created_at: now(),
        }
    }

    /// Validate the notification
    pub fn validate(&self) -> Result<(), NotificationValidationError> {
        if self.title.trim().is_empty() {
            return Err(NotificationValidationError::EmptyTitle);
        }

        if self.is_snoozed && self.snooze_until.is_none() {
            return Err(NotificationValidationError::SnoozeWithoutDeadline);
        }

        Ok(())
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}",
            self.title,
            self.scheduled_date_time.format("%Y-%m-%d %H:%M")
        )
    }
}

/// Validation errors for notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationValidationError {
    EmptyTitle,
    SnoozeWithoutDeadline,
}

impl fmt::Display for NotificationValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "Notification title cannot be empty"),
            Self::SnoozeWithoutDeadline => {
                write!(f, "Snoozed notification has no snooze deadline")
            }
        }
    }
}

impl std::error::Error for NotificationValidationError {}
