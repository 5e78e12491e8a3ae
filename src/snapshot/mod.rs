//! Snapshots: the unit of backup
//!
//! A snapshot is built in memory from the entity store, encoded with
//! [`codec::encode`] and never persisted in any other form.

pub mod codec;
pub mod records;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{Entity, EntityKind};

pub use codec::{decode, encode, summarize, SnapshotSummary, FORMAT_VERSION, MAX_SUPPORTED_VERSION};
pub use records::{
    EventRecord, MealRecord, NotificationActionRecord, NotificationRecord, RecipeRecord,
    TaskRecord,
};

/// A point-in-time copy of every entity collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,

    /// Local wall-clock time at which the snapshot was taken
    pub created_at: NaiveDateTime,

    /// Free-text producer identification, informational only
    pub device_info: String,

    pub events: Vec<EventRecord>,
    pub meals: Vec<MealRecord>,
    pub tasks: Vec<TaskRecord>,

    #[serde(default)]
    pub notifications: Vec<NotificationRecord>,
}

impl Snapshot {
    /// Create an empty snapshot at the current format version
    pub fn new(created_at: NaiveDateTime, device_info: impl Into<String>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            created_at,
            device_info: device_info.into(),
            events: Vec::new(),
            meals: Vec::new(),
            tasks: Vec::new(),
            notifications: Vec::new(),
        }
    }

    /// Append an entity to the collection for its kind
    pub fn push(&mut self, entity: &Entity) {
        match entity {
            Entity::Event(e) => self.events.push(e.into()),
            Entity::Meal(m) => self.meals.push(m.into()),
            Entity::Task(t) => self.tasks.push(t.into()),
            Entity::Notification(n) => self.notifications.push(n.into()),
        }
    }

    pub fn counts(&self) -> RecordCounts {
        RecordCounts {
            events: self.events.len(),
            meals: self.meals.len(),
            tasks: self.tasks.len(),
            notifications: self.notifications.len(),
        }
    }
}

/// Number of records of each kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCounts {
    pub events: usize,
    pub meals: usize,
    pub tasks: usize,
    pub notifications: usize,
}

impl RecordCounts {
    pub fn get(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Event => self.events,
            EntityKind::Meal => self.meals,
            EntityKind::Task => self.tasks,
            EntityKind::Notification => self.notifications,
        }
    }

    pub fn increment(&mut self, kind: EntityKind) {
        match kind {
            EntityKind::Event => self.events += 1,
            EntityKind::Meal => self.meals += 1,
            EntityKind::Task => self.tasks += 1,
            EntityKind::Notification => self.notifications += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.events + self.meals + self.tasks + self.notifications
    }
}

impl fmt::Display for RecordCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} events, {} meals, {} tasks, {} notifications",
            self.events, self.meals, self.tasks, self.notifications
        )
    }
}
