//! Core data models for the planner
//!
//! The four entity kinds the backup engine moves around: events, meals,
//! tasks and notifications, plus the enumerations they share.

pub mod enums;
pub mod event;
pub mod meal;
pub mod notification;
pub mod task;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use enums::{
    DietaryRestriction, EventCategory, MealType, NotificationActionType, NotificationPriority,
    NotificationType, Priority, RecipeDifficulty, Recurrence, TaskCategory,
};
pub use event::{Event, EventValidationError};
pub use meal::{Ingredient, Meal, MealValidationError, NutritionalInfo, Recipe};
pub use notification::{Notification, NotificationAction, NotificationValidationError};
pub use task::{Subtask, Task, TaskValidationError};

/// Store-assigned numeric identity
pub type RecordId = i64;

/// Identity carried by entities that have not been inserted yet
pub const UNASSIGNED_ID: RecordId = 0;

/// Current wall-clock time in the device's local timezone
pub fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// The kinds of entity held by the planner store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Event,
    Meal,
    Task,
    Notification,
}

impl EntityKind {
    /// Every kind, in backup/restore order
    pub const ALL: [EntityKind; 4] = [Self::Event, Self::Meal, Self::Task, Self::Notification];

    /// Plural label for summaries
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Event => "events",
            Self::Meal => "meals",
            Self::Task => "tasks",
            Self::Notification => "notifications",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event => write!(f, "event"),
            Self::Meal => write!(f, "meal"),
            Self::Task => write!(f, "task"),
            Self::Notification => write!(f, "notification"),
        }
    }
}

/// One stored entity of any kind
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Event(Event),
    Meal(Meal),
    Task(Task),
    Notification(Notification),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Event(_) => EntityKind::Event,
            Self::Meal(_) => EntityKind::Meal,
            Self::Task(_) => EntityKind::Task,
            Self::Notification(_) => EntityKind::Notification,
        }
    }

    pub fn id(&self) -> RecordId {
        match self {
            Self::Event(e) => e.id,
            Self::Meal(m) => m.id,
            Self::Task(t) => t.id,
            Self::Notification(n) => n.id,
        }
    }

    /// Replace the identity with a store-assigned one
    pub fn with_id(mut self, id: RecordId) -> Self {
        match &mut self {
            Self::Event(e) => e.id = id,
            Self::Meal(m) => m.id = id,
            Self::Task(t) => t.id = id,
            Self::Notification(n) => n.id = id,
        }
        self
    }

    /// Run the kind-specific validation, describing the first problem found
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Event(e) => e.validate().map_err(|err| err.to_string()),
            Self::Meal(m) => m.validate().map_err(|err| err.to_string()),
            Self::Task(t) => t.validate().map_err(|err| err.to_string()),
            Self::Notification(n) => n.validate().map_err(|err| err.to_string()),
        }
    }

    /// Whether the entity is marked complete (notifications never are)
    pub fn is_completed(&self) -> bool {
        match self {
            Self::Event(e) => e.is_completed,
            Self::Meal(m) => m.is_completed,
            Self::Task(t) => t.is_completed,
            Self::Notification(_) => false,
        }
    }
}
