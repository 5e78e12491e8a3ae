//! Snapshot record types
//!
//! A record mirrors its entity's full field set, except that enumeration
//! fields travel as their canonical names. Turning a record back into an
//! entity (`into_entity`) is where unknown names are caught, so a snapshot
//! written by a build with extra categories is rejected record by record
//! instead of failing to decode at all.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::{
    DietaryRestriction, Event, EventCategory, Ingredient, Meal, MealType, Notification,
    NotificationAction, NotificationActionType, NotificationPriority, NotificationType,
    NutritionalInfo, Priority, Recipe, RecipeDifficulty, Recurrence, RecordId, Subtask, Task,
    TaskCategory, UNASSIGNED_ID,
};

/// Parse one enumeration field, naming the field in the failure reason
fn parse_field<T>(parse: fn(&str) -> Option<T>, field: &str, value: &str) -> Result<T, String> {
    parse(value).ok_or_else(|| format!("unknown {} '{}'", field, value))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date_time: NaiveDateTime,
    pub end_date_time: Option<NaiveDateTime>,
    pub category: String,
    pub priority: String,
    pub recurrence: String,
    pub is_completed: bool,
    pub notification_enabled: bool,
    pub notification_minutes_before: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<&Event> for EventRecord {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            description: event.description.clone(),
            start_date_time: event.start_date_time,
            end_date_time: event.end_date_time,
            category: event.category.as_str().to_string(),
            priority: event.priority.as_str().to_string(),
            recurrence: event.recurrence.as_str().to_string(),
            is_completed: event.is_completed,
            notification_enabled: event.notification_enabled,
            notification_minutes_before: event.notification_minutes_before,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

impl EventRecord {
    /// Build an unstored event; the recorded id is dropped
    pub fn into_entity(self) -> Result<Event, String> {
        Ok(Event {
            id: UNASSIGNED_ID,
            category: parse_field(EventCategory::parse, "category", &self.category)?,
            priority: parse_field(Priority::parse, "priority", &self.priority)?,
            recurrence: parse_field(Recurrence::parse, "recurrence", &self.recurrence)?,
            title: self.title,
            description: self.description,
            start_date_time: self.start_date_time,
            end_date_time: self.end_date_time,
            is_completed: self.is_completed,
            notification_enabled: self.notification_enabled,
            notification_minutes_before: self.notification_minutes_before,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeRecord {
    pub name: String,
    pub instructions: Vec<String>,
    pub difficulty: String,
    #[serde(default)]
    pub cuisine: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<&Recipe> for RecipeRecord {
    fn from(recipe: &Recipe) -> Self {
        Self {
            name: recipe.name.clone(),
            instructions: recipe.instructions.clone(),
            difficulty: recipe.difficulty.as_str().to_string(),
            cuisine: recipe.cuisine.clone(),
            tags: recipe.tags.clone(),
        }
    }
}

impl RecipeRecord {
    fn into_recipe(self) -> Result<Recipe, String> {
        Ok(Recipe {
            difficulty: parse_field(RecipeDifficulty::parse, "recipe difficulty", &self.difficulty)?,
            name: self.name,
            instructions: self.instructions,
            cuisine: self.cuisine,
            tags: self.tags,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealRecord {
    pub id: RecordId,
    pub name: String,
    pub meal_type: String,
    pub scheduled_date_time: NaiveDateTime,
    pub recipe: Option<RecipeRecord>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    pub preparation_time_minutes: i32,
    pub cooking_time_minutes: i32,
    pub servings: i32,
    pub nutritional_info: Option<NutritionalInfo>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub notes: String,
    pub is_completed: bool,
    pub notification_enabled: bool,
    pub notification_minutes_before: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<&Meal> for MealRecord {
    fn from(meal: &Meal) -> Self {
        Self {
            id: meal.id,
            name: meal.name.clone(),
            meal_type: meal.meal_type.as_str().to_string(),
            scheduled_date_time: meal.scheduled_date_time,
            recipe: meal.recipe.as_ref().map(RecipeRecord::from),
            ingredients: meal.ingredients.clone(),
            preparation_time_minutes: meal.preparation_time_minutes,
            cooking_time_minutes: meal.cooking_time_minutes,
            servings: meal.servings,
            nutritional_info: meal.nutritional_info.clone(),
            dietary_restrictions: meal
                .dietary_restrictions
                .iter()
                .map(|r| r.as_str().to_string())
                .collect(),
            notes: meal.notes.clone(),
            is_completed: meal.is_completed,
            notification_enabled: meal.notification_enabled,
            notification_minutes_before: meal.notification_minutes_before,
            created_at: meal.created_at,
            updated_at: meal.updated_at,
        }
    }
}

impl MealRecord {
    /// Build an unstored meal; the recorded id is dropped
    pub fn into_entity(self) -> Result<Meal, String> {
        let dietary_restrictions = self
            .dietary_restrictions
            .iter()
            .map(|r| parse_field(DietaryRestriction::parse, "dietary restriction", r))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Meal {
            id: UNASSIGNED_ID,
            meal_type: parse_field(MealType::parse, "meal type", &self.meal_type)?,
            recipe: self.recipe.map(RecipeRecord::into_recipe).transpose()?,
            dietary_restrictions,
            name: self.name,
            scheduled_date_time: self.scheduled_date_time,
            ingredients: self.ingredients,
            preparation_time_minutes: self.preparation_time_minutes,
            cooking_time_minutes: self.cooking_time_minutes,
            servings: self.servings,
            nutritional_info: self.nutritional_info,
            notes: self.notes,
            is_completed: self.is_completed,
            notification_enabled: self.notification_enabled,
            notification_minutes_before: self.notification_minutes_before,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub priority: String,
    pub due_date_time: Option<NaiveDateTime>,
    pub estimated_duration_minutes: i32,
    pub is_completed: bool,
    pub completed_at: Option<NaiveDateTime>,
    pub recurrence: String,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub notification_enabled: bool,
    pub notification_minutes_before: i32,
    pub progress: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            category: task.category.as_str().to_string(),
            priority: task.priority.as_str().to_string(),
            due_date_time: task.due_date_time,
            estimated_duration_minutes: task.estimated_duration_minutes,
            is_completed: task.is_completed,
            completed_at: task.completed_at,
            recurrence: task.recurrence.as_str().to_string(),
            subtasks: task.subtasks.clone(),
            tags: task.tags.clone(),
            notification_enabled: task.notification_enabled,
            notification_minutes_before: task.notification_minutes_before,
            progress: task.progress,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

impl TaskRecord {
    /// Build an unstored task; the recorded id is dropped
    pub fn into_entity(self) -> Result<Task, String> {
        Ok(Task {
            id: UNASSIGNED_ID,
            category: parse_field(TaskCategory::parse, "category", &self.category)?,
            priority: parse_field(Priority::parse, "priority", &self.priority)?,
            recurrence: parse_field(Recurrence::parse, "recurrence", &self.recurrence)?,
            title: self.title,
            description: self.description,
            due_date_time: self.due_date_time,
            estimated_duration_minutes: self.estimated_duration_minutes,
            is_completed: self.is_completed,
            completed_at: self.completed_at,
            subtasks: self.subtasks,
            tags: self.tags,
            notification_enabled: self.notification_enabled,
            notification_minutes_before: self.notification_minutes_before,
            progress: self.progress,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationActionRecord {
    pub id: String,
    pub title: String,
    pub action_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: RecordId,
    pub title: String,
    pub message: String,
    pub notification_type: String,
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
    pub priority: String,
    #[serde(default)]
    pub actions: Vec<NotificationActionRecord>,
    pub created_at: NaiveDateTime,
}

impl From<&Notification> for NotificationRecord {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id,
            title: n.title.clone(),
            message: n.message.clone(),
            notification_type: n.notification_type.as_str().to_string(),
            related_item_id: n.related_item_id,
            scheduled_date_time: n.scheduled_date_time,
            is_delivered: n.is_delivered,
            delivered_at: n.delivered_at,
            is_dismissed: n.is_dismissed,
            dismissed_at: n.dismissed_at,
            is_snoozed: n.is_snoozed,
            snooze_until: n.snooze_until,
            sound_enabled: n.sound_enabled,
            vibration_enabled: n.vibration_enabled,
            led_enabled: n.led_enabled,
            priority: n.priority.as_str().to_string(),
            actions: n
                .actions
                .iter()
                .map(|a| NotificationActionRecord {
                    id: a.id.clone(),
                    title: a.title.clone(),
                    action_type: a.action_type.as_str().to_string(),
                })
                .collect(),
            created_at: n.created_at,
        }
    }
}

impl NotificationRecord {
    /// Build an unstored notification; the recorded id is dropped
    ///
    /// `related_item_id` still points at the pre-restore identity of the
    /// item it belonged to.
    pub fn into_entity(self) -> Result<Notification, String> {
        let actions = self
            .actions
            .into_iter()
            .map(|a| {
                Ok(NotificationAction {
                    action_type: parse_field(
                        NotificationActionType::parse,
                        "action type",
                        &a.action_type,
                    )?,
                    id: a.id,
                    title: a.title,
                })
            })
            .collect::<Result<Vec<_>, String>>()?;

        Ok(Notification {
            id: UNASSIGNED_ID,
            notification_type: parse_field(
                NotificationType::parse,
                "notification type",
                &self.notification_type,
            )?,
            priority: parse_field(NotificationPriority::parse, "priority", &self.priority)?,
            actions,
            title: self.title,
            message: self.message,
            related_item_id: self.related_item_id,
            scheduled_date_time: self.scheduled_date_time,
            is_delivered: self.is_delivered,
            delivered_at: self.delivered_at,
            is_dismissed: self.is_dismissed,
            dismissed_at: self.dismissed_at,
            is_snoozed: self.is_snoozed,
            snooze_until: self.snooze_until,
            sound_enabled: self.sound_enabled,
            vibration_enabled: self.vibration_enabled,
            led_enabled: self.led_enabled,
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::now;

    #[test]
    fn test_event_record_drops_identity() {
        let mut event = Event::new("Concert", now());
        event.id = 42;
        event.category = EventCategory::Social;

        let record = EventRecord::from(&event);
        assert_eq!(record.id, 42);
        assert_eq!(record.category, "SOCIAL");

        let restored = record.into_entity().unwrap();
        assert_eq!(restored.id, UNASSIGNED_ID);
        assert_eq!(restored, Event { id: UNASSIGNED_ID, ..event });
    }

    #[test]
    fn test_unknown_enumeration_is_reported() {
        let task = Task::new("Laundry", TaskCategory::CleaningHousehold);
        let mut record = TaskRecord::from(&task);
        record.priority = "SOMEDAY".to_string();

        let reason = record.into_entity().unwrap_err();
        assert_eq!(reason, "unknown priority 'SOMEDAY'");
    }

    #[test]
    fn test_meal_nested_enumerations() {
        let mut meal = Meal::new("Pad thai", MealType::Dinner, now());
        meal.dietary_restrictions = vec![DietaryRestriction::GlutenFree];
        meal.recipe = Some(Recipe {
            name: "Pad thai".into(),
            instructions: vec!["Soak noodles".into(), "Stir fry".into()],
            difficulty: RecipeDifficulty::Medium,
            cuisine: "Thai".into(),
            tags: vec![],
        });

        let mut record = MealRecord::from(&meal);
        assert_eq!(record.dietary_restrictions, vec!["GLUTEN_FREE".to_string()]);
        assert_eq!(record.clone().into_entity().unwrap().recipe, meal.recipe);

        record.recipe.as_mut().unwrap().difficulty = "EXPERT".into();
        assert_eq!(
            record.into_entity().unwrap_err(),
            "unknown recipe difficulty 'EXPERT'"
        );
    }

    #[test]
    fn test_notification_actions_round_trip() {
        let mut n = Notification::new("Stand up", "Stretch", NotificationType::TaskReminder, 3, now());
        n.actions.push(NotificationAction {
            id: "snooze".into(),
            title: "Snooze".into(),
            action_type: NotificationActionType::Snooze5Min,
        });

        let record = NotificationRecord::from(&n);
        assert_eq!(record.actions[0].action_type, "SNOOZE_5_MIN");
        assert_eq!(record.into_entity().unwrap().actions, n.actions);
    }
}
