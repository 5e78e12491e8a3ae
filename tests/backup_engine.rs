//! End-to-end tests for the backup engine against a file-backed store

use std::sync::Arc;

use chrono::Duration;
use tempfile::TempDir;

use planner_backup::backup::{BackupConfig, BackupManager, FileStore};
use planner_backup::crypto::{CipherProvider, FileKeyStore, KeyDerivationParams, SecureString};
use planner_backup::error::{BackupError, CryptoError, RestoreError};
use planner_backup::models::{
    now, DietaryRestriction, Entity, EntityKind, Event, EventCategory, Ingredient, Meal, MealType,
    NutritionalInfo, Priority, Recipe, RecipeDifficulty, Recurrence, Task, TaskCategory,
    UNASSIGNED_ID,
};
use planner_backup::storage::{EntityStore, PlannerStore};

struct Fixture {
    _temp_dir: TempDir,
    store: Arc<PlannerStore>,
    manager: BackupManager,
}

fn fixture() -> Fixture {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(PlannerStore::open(temp_dir.path().join("data").join("planner.json")).unwrap());
    let cipher = CipherProvider::new(
        Arc::new(FileKeyStore::new(temp_dir.path().join("keys").join("device.key"))),
        KeyDerivationParams::light(),
    );
    let config = BackupConfig {
        include_notifications: true,
        device_info: "integration test".into(),
        ..BackupConfig::default()
    };
    let manager = BackupManager::new(
        store.clone(),
        cipher,
        FileStore::new(temp_dir.path().join("backups")),
        config,
    );
    Fixture {
        _temp_dir: temp_dir,
        store,
        manager,
    }
}

/// 3 events, 2 meals and 5 tasks with non-default field values
fn seed(store: &PlannerStore) {
    let start = now();

    for (i, category) in [EventCategory::Work, EventCategory::Medical, EventCategory::Social]
        .into_iter()
        .enumerate()
    {
        let mut event = Event::new(format!("Event {}", i), start + Duration::days(i as i64));
        event.description = format!("Description {}", i);
        event.end_date_time = Some(event.start_date_time + Duration::hours(1));
        event.category = category;
        event.priority = Priority::High;
        event.recurrence = Recurrence::Weekly;
        event.notification_minutes_before = 30;
        store.insert(Entity::Event(event)).unwrap();
    }

    let mut dinner = Meal::new("Lentil curry", MealType::Dinner, start);
    dinner.recipe = Some(Recipe {
        name: "Lentil curry".into(),
        instructions: vec!["Rinse lentils".into(), "Simmer 25 minutes".into()],
        difficulty: RecipeDifficulty::Medium,
        cuisine: "Indian".into(),
        tags: vec!["weeknight".into()],
    });
    dinner.ingredients = vec![Ingredient {
        name: "Red lentils".into(),
        quantity: "1.5".into(),
        unit: "cup".into(),
        is_optional: false,
    }];
    dinner.servings = 4;
    dinner.nutritional_info = Some(NutritionalInfo {
        calories: 420,
        protein: 18.3,
        ..NutritionalInfo::default()
    });
    dinner.dietary_restrictions = vec![DietaryRestriction::Vegan, DietaryRestriction::GlutenFree];
    store.insert(Entity::Meal(dinner)).unwrap();
    store
        .insert(Entity::Meal(Meal::new("Oatmeal", MealType::Breakfast, start)))
        .unwrap();

    for i in 0..5 {
        let mut task = Task::new(format!("Task {}", i), TaskCategory::CleaningHousehold);
        task.tags = vec![format!("tag{}", i)];
        task.progress = i * 20;
        task.estimated_duration_minutes = 15;
        store.insert(Entity::Task(task)).unwrap();
    }
}

fn contents(store: &PlannerStore, kind: EntityKind) -> Vec<Entity> {
    store
        .list_all(kind)
        .unwrap()
        .into_iter()
        .map(|e| e.with_id(UNASSIGNED_ID))
        .collect()
}

fn clear(store: &PlannerStore) {
    for kind in EntityKind::ALL {
        store.clear_all(kind).unwrap();
    }
}

#[test]
fn test_password_backup_end_to_end() {
    let f = fixture();
    seed(&f.store);
    let before: Vec<Vec<Entity>> = EntityKind::ALL
        .iter()
        .map(|&kind| contents(&f.store, kind))
        .collect();
    let old_ids: Vec<i64> = f
        .store
        .list_all(EntityKind::Task)
        .unwrap()
        .iter()
        .map(|e| e.id())
        .collect();

    let created = f.manager.create_backup(Some("secret"), false).unwrap();
    assert!(created.artifact.is_encrypted);
    assert_eq!(created.counts.events, 3);
    assert_eq!(created.counts.meals, 2);
    assert_eq!(created.counts.tasks, 5);

    clear(&f.store);
    assert_eq!(f.store.count(EntityKind::Task).unwrap(), 0);

    let summary = f
        .manager
        .restore_backup(&created.artifact.path, Some("secret"), true)
        .unwrap();
    assert_eq!(summary.counts, created.counts);
    assert_eq!(summary.total(), 10);

    let after: Vec<Vec<Entity>> = EntityKind::ALL
        .iter()
        .map(|&kind| contents(&f.store, kind))
        .collect();
    assert_eq!(after, before);

    // Identity is regenerated, never carried over
    let new_ids: Vec<i64> = f
        .store
        .list_all(EntityKind::Task)
        .unwrap()
        .iter()
        .map(|e| e.id())
        .collect();
    assert!(new_ids.iter().all(|id| !old_ids.contains(id)));
}

#[test]
fn test_restore_survives_reopening_the_store() {
    let f = fixture();
    seed(&f.store);
    let created = f.manager.create_backup(None, true).unwrap();
    clear(&f.store);

    f.manager
        .restore_backup(&created.artifact.path, None, true)
        .unwrap();

    let reopened = PlannerStore::open(f.store.path().unwrap()).unwrap();
    assert_eq!(reopened.count(EntityKind::Event).unwrap(), 3);
    assert_eq!(reopened.count(EntityKind::Meal).unwrap(), 2);
    assert_eq!(reopened.count(EntityKind::Task).unwrap(), 5);
}

#[test]
fn test_append_twice_duplicates_content() {
    let f = fixture();
    seed(&f.store);
    let path = f.manager.create_backup(None, true).unwrap().artifact.path;

    f.manager.restore_backup(&path, None, false).unwrap();
    f.manager.restore_backup(&path, None, false).unwrap();

    assert_eq!(f.store.count(EntityKind::Event).unwrap(), 9);
    assert_eq!(f.store.count(EntityKind::Task).unwrap(), 15);
}

#[test]
fn test_replace_discards_newer_data() {
    let f = fixture();
    seed(&f.store);
    let path = f.manager.create_backup(None, true).unwrap().artifact.path;

    f.store
        .insert(Entity::Task(Task::new("Added later", TaskCategory::Other)))
        .unwrap();
    f.manager.restore_backup(&path, None, true).unwrap();

    let titles: Vec<String> = f
        .store
        .list_all(EntityKind::Task)
        .unwrap()
        .into_iter()
        .filter_map(|e| match e {
            Entity::Task(t) => Some(t.title),
            _ => None,
        })
        .collect();
    assert_eq!(titles, ["Task 0", "Task 1", "Task 2", "Task 3", "Task 4"]);
}

#[test]
fn test_wrong_password_leaves_store_untouched() {
    let f = fixture();
    seed(&f.store);
    let path = f.manager.create_backup(Some("secret"), true).unwrap().artifact.path;

    let err = f.manager.restore_backup(&path, Some("hunter2"), true).unwrap_err();
    assert!(matches!(
        err,
        RestoreError::DecryptionFailed(CryptoError::AuthenticationFailed)
    ));
    assert!(err.is_user_error());
    assert_eq!(f.store.count(EntityKind::Event).unwrap(), 3);
}

#[test]
fn test_inspect_without_password() {
    let f = fixture();
    seed(&f.store);
    let created = f.manager.create_backup(Some("secret"), true).unwrap();

    let info = f.manager.inspect_backup(&created.artifact.path).unwrap();
    assert!(info.is_encrypted);
    assert!(!info.contents_readable);
    assert_eq!(info.counts.total(), 0);
}

#[test]
fn test_backups_listed_newest_first() {
    let f = fixture();
    seed(&f.store);

    let first = f.manager.create_backup(None, true).unwrap().artifact;
    let second = f.manager.create_backup(None, true).unwrap().artifact;
    assert_ne!(first.file_name, second.file_name);

    let listed = f.manager.list_backups().unwrap();
    assert_eq!(listed, vec![second, first]);
}

#[test]
fn test_background_jobs() {
    let f = fixture();
    seed(&f.store);

    let job = f
        .manager
        .spawn_create(Some(SecureString::from("secret")), true)
        .unwrap();
    let created = job.wait().unwrap();

    let job = f
        .manager
        .spawn_restore(created.artifact.path.clone(), Some(SecureString::from("secret")), true)
        .unwrap();
    assert_eq!(job.wait().unwrap().total(), 10);
    assert!(!f.manager.is_busy());
}

#[test]
fn test_second_operation_fails_fast() {
    let f = fixture();
    seed(&f.store);
    let path = f.manager.create_backup(None, true).unwrap().artifact.path;

    let job = f.manager.spawn_restore(path, None, false).unwrap();
    let second = f.manager.create_backup(None, true);
    let restored = job.wait().unwrap();
    assert_eq!(restored.total(), 10);

    // The create either lost the race or ran after the restore finished
    match second {
        Err(BackupError::AlreadyInProgress) => {}
        Ok(created) => assert!(created.total() >= 10),
        Err(other) => panic!("unexpected error: {}", other),
    }
}
