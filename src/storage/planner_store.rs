//! JSON-file planner store
//!
//! Holds every entity kind in one `planner.json` document. Outside a
//! transaction each write is persisted immediately; inside one, writes stay
//! in memory until `commit`, and `rollback` restores the state captured at
//! `begin_transaction`.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};

use super::file_io::{read_json, write_json_atomic};
use super::{EntityStore, StoreResult};
use crate::error::{PlannerResult, StoreError};
use crate::models::{Entity, EntityKind, Event, Meal, Notification, RecordId, Task};

/// Next identity to hand out for each kind; identities are never reused
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NextIds {
    event: RecordId,
    meal: RecordId,
    task: RecordId,
    notification: RecordId,
}

impl Default for NextIds {
    fn default() -> Self {
        Self {
            event: 1,
            meal: 1,
            task: 1,
            notification: 1,
        }
    }
}

impl NextIds {
    fn take(&mut self, kind: EntityKind) -> RecordId {
        let slot = match kind {
            EntityKind::Event => &mut self.event,
            EntityKind::Meal => &mut self.meal,
            EntityKind::Task => &mut self.task,
            EntityKind::Notification => &mut self.notification,
        };
        let id = *slot;
        *slot += 1;
        id
    }
}

/// Serializable store contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PlannerData {
    #[serde(default)]
    next_ids: NextIds,
    #[serde(default)]
    events: Vec<Event>,
    #[serde(default)]
    meals: Vec<Meal>,
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    notifications: Vec<Notification>,
}

impl PlannerData {
    fn len(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Event => self.events.len(),
            EntityKind::Meal => self.meals.len(),
            EntityKind::Task => self.tasks.len(),
            EntityKind::Notification => self.notifications.len(),
        }
    }

    fn entities(&self, kind: EntityKind) -> Vec<Entity> {
        match kind {
            EntityKind::Event => self.events.iter().cloned().map(Entity::Event).collect(),
            EntityKind::Meal => self.meals.iter().cloned().map(Entity::Meal).collect(),
            EntityKind::Task => self.tasks.iter().cloned().map(Entity::Task).collect(),
            EntityKind::Notification => self
                .notifications
                .iter()
                .cloned()
                .map(Entity::Notification)
                .collect(),
        }
    }

    fn push(&mut self, entity: Entity) {
        match entity {
            Entity::Event(e) => self.events.push(e),
            Entity::Meal(m) => self.meals.push(m),
            Entity::Task(t) => self.tasks.push(t),
            Entity::Notification(n) => self.notifications.push(n),
        }
    }

    fn pop(&mut self, kind: EntityKind) {
        match kind {
            EntityKind::Event => drop(self.events.pop()),
            EntityKind::Meal => drop(self.meals.pop()),
            EntityKind::Task => drop(self.tasks.pop()),
            EntityKind::Notification => drop(self.notifications.pop()),
        }
    }

    /// Remove a kind's entities, returning them so a failed persist can put them back
    fn take(&mut self, kind: EntityKind) -> PlannerData {
        let mut removed = PlannerData::default();
        match kind {
            EntityKind::Event => removed.events = std::mem::take(&mut self.events),
            EntityKind::Meal => removed.meals = std::mem::take(&mut self.meals),
            EntityKind::Task => removed.tasks = std::mem::take(&mut self.tasks),
            EntityKind::Notification => {
                removed.notifications = std::mem::take(&mut self.notifications)
            }
        }
        removed
    }

    fn restore(&mut self, kind: EntityKind, mut removed: PlannerData) {
        match kind {
            EntityKind::Event => self.events = std::mem::take(&mut removed.events),
            EntityKind::Meal => self.meals = std::mem::take(&mut removed.meals),
            EntityKind::Task => self.tasks = std::mem::take(&mut removed.tasks),
            EntityKind::Notification => {
                self.notifications = std::mem::take(&mut removed.notifications)
            }
        }
    }
}

/// Planner store backed by a JSON file, or by nothing for `in_memory`
pub struct PlannerStore {
    path: Option<PathBuf>,
    data: RwLock<PlannerData>,
    /// State captured by `begin_transaction`
    transaction: Mutex<Option<PlannerData>>,
}

impl PlannerStore {
    /// Open the store at `path`, starting empty if the file doesn't exist
    pub fn open(path: impl Into<PathBuf>) -> PlannerResult<Self> {
        let path = path.into();
        let data: PlannerData = read_json(&path)?;
        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
            transaction: Mutex::new(None),
        })
    }

    /// A store that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(PlannerData::default()),
            transaction: Mutex::new(None),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of stored entities of `kind`
    pub fn count(&self, kind: EntityKind) -> StoreResult<usize> {
        Ok(self.read()?.len(kind))
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, PlannerData>> {
        self.data
            .read()
            .map_err(|e| StoreError::Unavailable(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, PlannerData>> {
        self.data
            .write()
            .map_err(|e| StoreError::Unavailable(format!("Failed to acquire write lock: {}", e)))
    }

    fn in_transaction(&self) -> StoreResult<bool> {
        let transaction = self.transaction.lock().map_err(|e| {
            StoreError::Unavailable(format!("Failed to acquire transaction lock: {}", e))
        })?;
        Ok(transaction.is_some())
    }

    fn persist(&self, data: &PlannerData) -> StoreResult<()> {
        match &self.path {
            Some(path) => Ok(write_json_atomic(path, data)?),
            None => Ok(()),
        }
    }
}

impl EntityStore for PlannerStore {
    fn list_all(&self, kind: EntityKind) -> StoreResult<Vec<Entity>> {
        Ok(self.read()?.entities(kind))
    }

    fn insert(&self, entity: Entity) -> StoreResult<RecordId> {
        let deferred = self.in_transaction()?;
        let mut data = self.write()?;

        let kind = entity.kind();
        let id = data.next_ids.take(kind);
        data.push(entity.with_id(id));

        if !deferred {
            if let Err(e) = self.persist(&data) {
                data.pop(kind);
                return Err(e);
            }
        }
        Ok(id)
    }

    fn clear_all(&self, kind: EntityKind) -> StoreResult<()> {
        let deferred = self.in_transaction()?;
        let mut data = self.write()?;

        let removed = data.take(kind);
        if !deferred {
            if let Err(e) = self.persist(&data) {
                data.restore(kind, removed);
                return Err(e);
            }
        }
        Ok(())
    }

    fn supports_transactions(&self) -> bool {
        true
    }

    fn begin_transaction(&self) -> StoreResult<()> {
        let mut transaction = self.transaction.lock().map_err(|e| {
            StoreError::Unavailable(format!("Failed to acquire transaction lock: {}", e))
        })?;
        if transaction.is_some() {
            return Err(StoreError::TransactionAlreadyOpen);
        }
        *transaction = Some(self.read()?.clone());
        Ok(())
    }

    fn commit(&self) -> StoreResult<()> {
        let mut transaction = self.transaction.lock().map_err(|e| {
            StoreError::Unavailable(format!("Failed to acquire transaction lock: {}", e))
        })?;
        if transaction.is_none() {
            return Err(StoreError::NoTransaction);
        }

        // Persist first; on failure the transaction stays open for rollback
        self.persist(&*self.read()?)?;
        *transaction = None;
        Ok(())
    }

    fn rollback(&self) -> StoreResult<()> {
        let mut transaction = self.transaction.lock().map_err(|e| {
            StoreError::Unavailable(format!("Failed to acquire transaction lock: {}", e))
        })?;
        let saved = transaction.take().ok_or(StoreError::NoTransaction)?;
        *self.write()? = saved;
        Ok(())
    }
}
