//! Enumerations shared by the planner entities
//!
//! Every enumeration has one canonical SCREAMING_SNAKE_CASE name per variant.
//! That name is what the JSON store and backup snapshots carry, and what
//! `parse` accepts back.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate a closed enumeration with canonical string names
macro_rules! define_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $canonical:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $canonical)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The canonical name of this variant
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $canonical,)+
                }
            }

            /// Parse a canonical name; unknown names yield `None`
            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($canonical => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_enum!(
    /// What an event is about
    EventCategory {
        Personal => "PERSONAL",
        Work => "WORK",
        Medical => "MEDICAL",
        Social => "SOCIAL",
        Recreation => "RECREATION",
        Other => "OTHER",
    }
);

define_enum!(
    /// Urgency shared by events and tasks
    Priority {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
        Urgent => "URGENT",
    }
);

define_enum!(
    /// Repeat rule for events and tasks
    Recurrence {
        None => "NONE",
        Daily => "DAILY",
        Weekly => "WEEKLY",
        Monthly => "MONTHLY",
        Yearly => "YEARLY",
    }
);

define_enum!(
    MealType {
        Breakfast => "BREAKFAST",
        Lunch => "LUNCH",
        Dinner => "DINNER",
        Snack => "SNACK",
    }
);

define_enum!(
    RecipeDifficulty {
        Easy => "EASY",
        Medium => "MEDIUM",
        Hard => "HARD",
    }
);

define_enum!(
    DietaryRestriction {
        Vegetarian => "VEGETARIAN",
        Vegan => "VEGAN",
        GlutenFree => "GLUTEN_FREE",
        DairyFree => "DAIRY_FREE",
        Keto => "KETO",
        Paleo => "PALEO",
        LowCarb => "LOW_CARB",
        LowFat => "LOW_FAT",
        Halal => "HALAL",
        Kosher => "KOSHER",
    }
);

define_enum!(
    /// Household area a task belongs to
    TaskCategory {
        CookingMealPrep => "COOKING_MEAL_PREP",
        CleaningHousehold => "CLEANING_HOUSEHOLD",
        GroceryShopping => "GROCERY_SHOPPING",
        MedicalAppointments => "MEDICAL_APPOINTMENTS",
        PersonalCare => "PERSONAL_CARE",
        WorkProfessional => "WORK_PROFESSIONAL",
        RecreationSocial => "RECREATION_SOCIAL",
        Other => "OTHER",
    }
);

define_enum!(
    NotificationType {
        EventReminder => "EVENT_REMINDER",
        MealReminder => "MEAL_REMINDER",
        TaskReminder => "TASK_REMINDER",
        BackupReminder => "BACKUP_REMINDER",
        SystemNotification => "SYSTEM_NOTIFICATION",
    }
);

define_enum!(
    NotificationPriority {
        Min => "MIN",
        Low => "LOW",
        Default => "DEFAULT",
        High => "HIGH",
        Max => "MAX",
    }
);

define_enum!(
    /// Button attached to a delivered notification
    NotificationActionType {
        Dismiss => "DISMISS",
        Snooze5Min => "SNOOZE_5_MIN",
        Snooze15Min => "SNOOZE_15_MIN",
        Snooze30Min => "SNOOZE_30_MIN",
        Snooze1Hour => "SNOOZE_1_HOUR",
        MarkComplete => "MARK_COMPLETE",
        ViewDetails => "VIEW_DETAILS",
        OpenApp => "OPEN_APP",
    }
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_names_round_trip() {
        for category in TaskCategory::ALL {
            assert_eq!(TaskCategory::parse(category.as_str()), Some(*category));
        }
        for restriction in DietaryRestriction::ALL {
            assert_eq!(
                DietaryRestriction::parse(&restriction.to_string()),
                Some(*restriction)
            );
        }
    }

    #[test]
    fn test_parse_is_exact() {
        assert_eq!(Priority::parse("HIGH"), Some(Priority::High));
        assert_eq!(Priority::parse("high"), None);
        assert_eq!(Priority::parse("SOMEDAY"), None);
    }

    #[test]
    fn test_serde_uses_canonical_names() {
        let json = serde_json::to_string(&NotificationActionType::Snooze15Min).unwrap();
        assert_eq!(json, "\"SNOOZE_15_MIN\"");

        let parsed: MealType = serde_json::from_str("\"DINNER\"").unwrap();
        assert_eq!(parsed, MealType::Dinner);
    }
}
