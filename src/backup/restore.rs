//! Restore importer
//!
//! Applies a decoded snapshot to the entity store. Every record is parsed
//! and validated before the store is touched. The writes then happen inside
//! one store transaction, or as one batched mutation, when the store offers
//! either; otherwise record by record.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{ImportError, StoreError};
use crate::models::{Entity, EntityKind};
use crate::snapshot::{RecordCounts, Snapshot};
use crate::storage::EntityStore;

/// Outcome of a successful restore
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestoreSummary {
    /// Entities inserted per kind
    pub counts: RecordCounts,
    /// When the restored snapshot was originally taken
    pub snapshot_created_at: NaiveDateTime,
    pub format_version: u32,
    /// Whether existing entities were cleared first
    pub replaced_existing: bool,
}

impl RestoreSummary {
    pub fn total(&self) -> usize {
        self.counts.total()
    }

    /// Get a summary of what was restored
    pub fn summary(&self) -> String {
        format!(
            "Restored {} items ({}) from backup taken {}",
            self.total(),
            self.counts,
            self.snapshot_created_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// A validated entity waiting to be inserted, with its position in the snapshot
struct Staged {
    kind: EntityKind,
    index: usize,
    entity: Entity,
}

/// Imports snapshots into an entity store
pub struct RestoreImporter<'a> {
    store: &'a dyn EntityStore,
}

impl<'a> RestoreImporter<'a> {
    pub fn new(store: &'a dyn EntityStore) -> Self {
        Self { store }
    }

    /// Insert every record of `snapshot` with fresh identity
    ///
    /// With `replace_existing`, all entities of every kind are cleared
    /// first. Records keep their relative order within each kind.
    pub fn import(
        &self,
        snapshot: Snapshot,
        replace_existing: bool,
    ) -> Result<RestoreSummary, ImportError> {
        let snapshot_created_at = snapshot.created_at;
        let format_version = snapshot.format_version;
        let staged = stage_records(snapshot)?;

        let counts = if self.store.supports_transactions() {
            self.apply_in_transaction(&staged, replace_existing)?
        } else if self.store.supports_batch() {
            self.apply_as_batch(staged, replace_existing)?
        } else {
            self.apply(&staged, replace_existing)
                .map_err(|(kind, index, source)| ImportError::PartialFailure {
                    kind,
                    index,
                    source,
                })?
        };

        tracing::debug!(%counts, replace_existing, "snapshot imported");

        Ok(RestoreSummary {
            counts,
            snapshot_created_at,
            format_version,
            replaced_existing: replace_existing,
        })
    }

    fn apply_in_transaction(
        &self,
        staged: &[Staged],
        replace_existing: bool,
    ) -> Result<RecordCounts, ImportError> {
        self.store.begin_transaction().map_err(ImportError::Store)?;

        let result = self
            .apply(staged, replace_existing)
            .map_err(|(_, _, source)| source)
            .and_then(|counts| self.store.commit().map(|()| counts));

        result.map_err(|source| {
            if let Err(e) = self.store.rollback() {
                tracing::warn!(error = %e, "rollback after failed import also failed");
            }
            ImportError::Store(source)
        })
    }

    fn apply_as_batch(
        &self,
        staged: Vec<Staged>,
        replace_existing: bool,
    ) -> Result<RecordCounts, ImportError> {
        let mut counts = RecordCounts::default();
        let entities = staged
            .into_iter()
            .map(|item| {
                counts.increment(item.kind);
                item.entity
            })
            .collect();

        self.store
            .apply_batch(replace_existing, entities)
            .map_err(ImportError::Store)?;
        Ok(counts)
    }

    /// Clear (optionally) and insert; a failure reports where it stopped
    fn apply(
        &self,
        staged: &[Staged],
        replace_existing: bool,
    ) -> Result<RecordCounts, (EntityKind, usize, StoreError)> {
        if replace_existing {
            for kind in EntityKind::ALL {
                self.store.clear_all(kind).map_err(|e| (kind, 0, e))?;
            }
        }

        let mut counts = RecordCounts::default();
        for item in staged {
            self.store
                .insert(item.entity.clone())
                .map_err(|e| (item.kind, item.index, e))?;
            counts.increment(item.kind);
        }
        Ok(counts)
    }
}

/// Convert and validate every record before any write happens
fn stage_records(snapshot: Snapshot) -> Result<Vec<Staged>, ImportError> {
    let mut staged = Vec::with_capacity(snapshot.counts().total());

    fn push<R>(
        staged: &mut Vec<Staged>,
        kind: EntityKind,
        records: Vec<R>,
        convert: impl Fn(R) -> Result<Entity, String>,
    ) -> Result<(), ImportError> {
        for (index, record) in records.into_iter().enumerate() {
            let entity = convert(record).map_err(|reason| ImportError::InvalidRecord {
                kind,
                index,
                reason,
            })?;
            staged.push(Staged {
                kind,
                index,
                entity,
            });
        }
        Ok(())
    }

    push(&mut staged, EntityKind::Event, snapshot.events, |r| {
        let event = r.into_entity()?;
        event.validate().map_err(|e| e.to_string())?;
        Ok(Entity::Event(event))
    })?;
    push(&mut staged, EntityKind::Meal, snapshot.meals, |r| {
        let meal = r.into_entity()?;
        meal.validate().map_err(|e| e.to_string())?;
        Ok(Entity::Meal(meal))
    })?;
    push(&mut staged, EntityKind::Task, snapshot.tasks, |r| {
        let task = r.into_entity()?;
        task.validate().map_err(|e| e.to_string())?;
        Ok(Entity::Task(task))
    })?;
    push(
        &mut staged,
        EntityKind::Notification,
        snapshot.notifications,
        |r| {
            let notification = r.into_entity()?;
            notification.validate().map_err(|e| e.to_string())?;
            Ok(Entity::Notification(notification))
        },
    )?;

    Ok(staged)
}
