pub mod memory;

pub use memory::MemoryStore;

use crate::core::{EntityId, Fields};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure surfaced by a persistence backend.
///
/// The core only inspects success/failure and affected-row counts; backend
/// error codes stay on the backend side of this boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Store error: {0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// One persisted entity as handed out by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub fields: Fields,
}

impl EntityRecord {
    pub fn new(id: impl Into<EntityId>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Scope of a `fetch_all` call: everything, or only the rows belonging to
/// one owning entity (a per-user history view).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerFilter {
    All,
    Owner(EntityId),
}

/// The persistence contract consumed by the list-view core.
///
/// All calls are parameterized — no caller value is ever concatenated into
/// backend query text. Mutations report how many rows they affected and are
/// all-or-nothing per call. Wrap a real database client in this trait for
/// production use; `MemoryStore` covers tests and simple apps.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Fetch an ordered snapshot of all entities within `filter`.
    async fn fetch_all(&self, filter: OwnerFilter) -> StoreResult<Vec<EntityRecord>>;

    /// Fetch one entity by id, `None` when it does not exist.
    async fn fetch_one(&self, id: EntityId) -> StoreResult<Option<EntityRecord>>;

    /// Overwrite the given canonical fields of one entity. Returns the
    /// affected-row count (0 when the id no longer exists).
    async fn update(&self, id: EntityId, fields: &Fields) -> StoreResult<u64>;

    /// Delete one entity by id. Returns the affected-row count.
    async fn delete(&self, id: EntityId) -> StoreResult<u64>;
}
