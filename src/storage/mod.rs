//! Storage layer for the planner
//!
//! The backup engine sees the planner's data only through [`EntityStore`]:
//! enumerate every entity of a kind, insert with fresh identity, clear a
//! kind, and optionally group those writes in a transaction.
//! [`PlannerStore`] is the JSON-file implementation used by the CLI.

pub mod file_io;
pub mod planner_store;

pub use crate::models::{Entity, EntityKind, RecordId};
pub use file_io::{read_json, write_json_atomic};
pub use planner_store::PlannerStore;

use crate::error::StoreError;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// The entity store collaborator
///
/// Methods take `&self`; implementations guard their state internally so a
/// store can be shared between the caller and a background backup job.
pub trait EntityStore: Send + Sync {
    /// Every stored entity of `kind`, in insertion order
    fn list_all(&self, kind: EntityKind) -> StoreResult<Vec<Entity>>;

    /// Insert an entity and return its newly assigned identity
    ///
    /// Any identity already present on `entity` is ignored.
    fn insert(&self, entity: Entity) -> StoreResult<RecordId>;

    /// Remove every entity of `kind`
    fn clear_all(&self, kind: EntityKind) -> StoreResult<()>;

    fn supports_transactions(&self) -> bool {
        false
    }

    fn begin_transaction(&self) -> StoreResult<()> {
        Err(StoreError::TransactionsUnsupported)
    }

    fn commit(&self) -> StoreResult<()> {
        Err(StoreError::TransactionsUnsupported)
    }

    fn rollback(&self) -> StoreResult<()> {
        Err(StoreError::TransactionsUnsupported)
    }

    /// Whether [`apply_batch`](Self::apply_batch) is applied all or nothing
    fn supports_batch(&self) -> bool {
        false
    }

    /// Clear every kind (if `clear_existing`), then insert `entities` in
    /// order, as a single mutation
    fn apply_batch(&self, _clear_existing: bool, _entities: Vec<Entity>) -> StoreResult<()> {
        Err(StoreError::BatchUnsupported)
    }
}
