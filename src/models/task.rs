//! Task model
//!
//! To-do items with subtasks, tags, progress tracking and optional due dates.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::enums::{Priority, Recurrence, TaskCategory};
use super::{now, RecordId, UNASSIGNED_ID};

/// A checklist item nested inside a task
///
/// Subtask ids are local to their parent task and travel with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
    pub completed_at: Option<NaiveDateTime>,
}

/// A to-do item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier
    pub id: RecordId,

    pub title: String,

    #[serde(default)]
    pub description: String,

    pub category: TaskCategory,

    pub priority: Priority,

    pub due_date_time: Option<NaiveDateTime>,

    pub estimated_duration_minutes: i32,

    pub is_completed: bool,

    pub completed_at: Option<NaiveDateTime>,

    pub recurrence: Recurrence,

    #[serde(default)]
    pub subtasks: Vec<Subtask>,

    #[serde(default)]
    pub tags: Vec<String>,

    pub notification_enabled: bool,

    pub notification_minutes_before: i32,

    /// Percent complete, 0-100
    pub progress: i32,

    pub created_at: NaiveDateTime,

    pub updated_at: NaiveDateTime,
}

impl Task {
    /// Create a new, not yet stored, task
    pub fn new(title: impl Into<String>, category: TaskCategory) -> Self {
        let now = now();
        Self {
            id: UNASSIGNED_ID,
            title: title.into(),
            description: String::new(),
            category,
            priority: Priority::Medium,
            due_date_time: None,
            estimated_duration_minutes: 30,
            is_completed: false,
            completed_at: None,
            recurrence: Recurrence::None,
            subtasks: Vec::new(),
            tags: Vec::new(),
            notification_enabled: true,
            notification_minutes_before: 15,
            progress: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the task complete at the given time
    pub fn complete(&mut self, at: NaiveDateTime) {
        self.is_completed = true;
        self.completed_at = Some(at);
        self.progress = 100;
        self.updated_at = at;
    }

    /// Validate the task
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::EmptyTitle);
        }

        if !(0..=100).contains(&self.progress) {
            return Err(TaskValidationError::ProgressOutOfRange(self.progress));
        }

        if self.estimated_duration_minutes < 0 {
            return Err(TaskValidationError::NegativeDuration(
                self.estimated_duration_minutes,
            ));
        }

        if self.notification_minutes_before < 0 {
            return Err(TaskValidationError::NegativeReminder(
                self.notification_minutes_before,
            ));
        }

        if self
            .subtasks
            .iter()
            .any(|subtask| subtask.title.trim().is_empty())
        {
            return Err(TaskValidationError::EmptySubtaskTitle);
        }

        Ok(())
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}%]", self.title, self.progress)
    }
}

/// Validation errors for tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyTitle,
    ProgressOutOfRange(i32),
    NegativeDuration(i32),
    NegativeReminder(i32),
    EmptySubtaskTitle,
}

impl fmt::Display for TaskValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "Task title cannot be empty"),
            Self::ProgressOutOfRange(p) => write!(f, "Task progress must be 0-100 (got {})", p),
            Self::NegativeDuration(m) => {
                write!(f, "Estimated duration cannot be negative ({} minutes)", m)
            }
            Self::NegativeReminder(m) => {
                write!(f, "Reminder lead time cannot be negative ({} minutes)", m)
            }
            Self::EmptySubtaskTitle => write!(f, "Subtask title cannot be empty"),
        }
    }
}

impl std::error::Error for TaskValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_defaults() {
        let task = Task::new("Mop floors", TaskCategory::CleaningHousehold);
        assert_eq!(task.progress, 0);
        assert_eq!(task.estimated_duration_minutes, 30);
        assert!(!task.is_completed);
        assert!(task.validate().is_ok());
    }

    #[test]
    fn test_complete_sets_progress() {
        let mut task = Task::new("File taxes", TaskCategory::WorkProfessional);
        let at = now();
        task.complete(at);
        assert!(task.is_completed);
        assert_eq!(task.completed_at, Some(at));
        assert_eq!(task.progress, 100);
    }

    #[test]
    fn test_progress_range_enforced() {
        let mut task = Task::new("Read", TaskCategory::RecreationSocial);
        task.progress = 101;
        assert_eq!(
            task.validate(),
            Err(TaskValidationError::ProgressOutOfRange(101))
        );
    }
}
