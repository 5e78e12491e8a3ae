//! Meal model
//!
//! Planned meals with optional recipe, ingredient list and nutrition facts.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::enums::{DietaryRestriction, MealType, RecipeDifficulty};
use super::{now, RecordId, UNASSIGNED_ID};

/// Cooking instructions attached to a meal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub instructions: Vec<String>,
    pub difficulty: RecipeDifficulty,
    #[serde(default)]
    pub cuisine: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One line of a shopping/ingredient list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub is_optional: bool,
}

/// Nutrition facts per serving
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionalInfo {
    pub calories: i32,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
    pub fiber: f64,
    pub sugar: f64,
    pub sodium: f64,
}

impl NutritionalInfo {
    fn amounts(&self) -> [f64; 6] {
        [
            self.protein,
            self.carbohydrates,
            self.fat,
            self.fiber,
            self.sugar,
            self.sodium,
        ]
    }

    fn has_negative_value(&self) -> bool {
        self.calories < 0 || self.amounts().iter().any(|v| *v < 0.0)
    }

    /// NaN and infinities have no JSON representation
    fn has_non_finite_value(&self) -> bool {
        self.amounts().iter().any(|v| !v.is_finite())
    }
}

/// A planned meal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    /// Store-assigned identifier
    pub id: RecordId,

    pub name: String,

    pub meal_type: MealType,

    pub scheduled_date_time: NaiveDateTime,

    pub recipe: Option<Recipe>,

    #[serde(default)]
    pub ingredients: Vec<Ingredient>,

    pub preparation_time_minutes: i32,

    pub cooking_time_minutes: i32,

    pub servings: i32,

    pub nutritional_info: Option<NutritionalInfo>,

    #[serde(default)]
    pub dietary_restrictions: Vec<DietaryRestriction>,

    #[serde(default)]
    pub notes: String,

    pub is_completed: bool,

    pub notification_enabled: bool,

    pub notification_minutes_before: i32,

    pub created_at: NaiveDateTime,

    pub updated_at: NaiveDateTime,
}

impl Meal {
    /// Create a new, not yet stored, meal
    pub fn new(name: impl Into<String>, meal_type: MealType, scheduled: NaiveDateTime) -> Self {
        let now = now();
        Self {
            id: UNASSIGNED_ID,
            name: name.into(),
            meal_type,
            scheduled_date_time: scheduled,
            recipe: None,
            ingredients: Vec::new(),
            preparation_time_minutes: 0,
            cooking_time_minutes: 0,
            servings: 1,
            nutritional_info: None,
            dietary_restrictions: Vec::new(),
            notes: String::new(),
            is_completed: false,
            notification_enabled: true,
            notification_minutes_before: 30,
            created_at: now,
            updated_at: now,
        }
    }

    /// Total hands-on plus cooking time
    pub fn total_time_minutes(&self) -> i32 {
        self.preparation_time_minutes + self.cooking_time_minutes
    }

    /// Validate the meal
    pub fn validate(&self) -> Result<(), MealValidationError> {
        if self.name.trim().is_empty() {
            return Err(MealValidationError::EmptyName);
        }

        if self.servings < 1 {
            return Err(MealValidationError::InvalidServings(self.servings));
        }

        if self.preparation_time_minutes < 0 || self.cooking_time_minutes < 0 {
            return Err(MealValidationError::NegativeDuration);
        }

        if self.notification_minutes_before < 0 {
            return Err(MealValidationError::NegativeReminder(
                self.notification_minutes_before,
            ));
        }

        if let Some(recipe) = &self.recipe {
            if recipe.name.trim().is_empty() {
                return Err(MealValidationError::EmptyRecipeName);
            }
        }

        if self
            .ingredients
            .iter()
            .any(|ingredient| ingredient.name.trim().is_empty())
        {
            return Err(MealValidationError::EmptyIngredientName);
        }

        if let Some(info) = &self.nutritional_info {
            if info.has_non_finite_value() {
                return Err(MealValidationError::NonFiniteNutrition);
            }
            if info.has_negative_value() {
                return Err(MealValidationError::NegativeNutrition);
            }
        }

        Ok(())
    }
}

impl fmt::Display for Meal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.meal_type)
    }
}

/// Validation errors for meals
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MealValidationError {
    EmptyName,
    InvalidServings(i32),
    NegativeDuration,
    NegativeReminder(i32),
    EmptyRecipeName,
    EmptyIngredientName,
    NegativeNutrition,
    NonFiniteNutrition,
}

impl fmt::Display for MealValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Meal name cannot be empty"),
            Self::InvalidServings(n) => write!(f, "Meal must have at least one serving (got {})", n),
            Self::NegativeDuration => write!(f, "Preparation and cooking times cannot be negative"),
            Self::NegativeReminder(minutes) => {
                write!(f, "Reminder lead time cannot be negative ({} minutes)", minutes)
            }
            Self::EmptyRecipeName => write!(f, "Recipe name cannot be empty"),
            Self::EmptyIngredientName => write!(f, "Ingredient name cannot be empty"),
            Self::NegativeNutrition => write!(f, "Nutritional values cannot be negative"),
            Self::NonFiniteNutrition => write!(f, "Nutritional values must be finite numbers"),
        }
    }
}

impl std::error::Error for MealValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_new_meal_is_valid() {
        let meal = Meal::new("Lentil soup", MealType::Lunch, noon());
        assert_eq!(meal.servings, 1);
        assert_eq!(meal.notification_minutes_before, 30);
        assert!(meal.validate().is_ok());
    }

    #[test]
    fn test_zero_servings_rejected() {
        let mut meal = Meal::new("Toast", MealType::Breakfast, noon());
        meal.servings = 0;
        assert_eq!(meal.validate(), Err(MealValidationError::InvalidServings(0)));
    }

    #[test]
    fn test_negative_nutrition_rejected() {
        let mut meal = Meal::new("Salad", MealType::Dinner, noon());
        meal.nutritional_info = Some(NutritionalInfo {
            fat: -1.0,
            ..Default::default()
        });
        assert_eq!(meal.validate(), Err(MealValidationError::NegativeNutrition));
    }

    #[test]
    fn test_non_finite_nutrition_rejected() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut meal = Meal::new("Salad", MealType::Dinner, noon());
            meal.nutritional_info = Some(NutritionalInfo {
                protein: value,
                ..Default::default()
            });
            assert_eq!(meal.validate(), Err(MealValidationError::NonFiniteNutrition));
        }
    }

    #[test]
    fn test_total_time() {
        let mut meal = Meal::new("Curry", MealType::Dinner, noon());
        meal.preparation_time_minutes = 15;
        meal.cooking_time_minutes = 40;
        assert_eq!(meal.total_time_minutes(), 55);
    }
}
