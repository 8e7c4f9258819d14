use super::{EntityRecord, EntityStore, OwnerFilter, StoreError, StoreResult};
use crate::core::{EntityId, Fields};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredRow {
    owner: Option<EntityId>,
    fields: Fields,
}

/// Seed shape accepted by [`MemoryStore::from_json`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedRecord {
    pub id: i64,
    #[serde(default)]
    pub owner: Option<i64>,
    pub fields: Fields,
}

#[derive(Debug)]
struct Inner {
    rows: BTreeMap<i64, StoredRow>,
    next_id: i64,
}

/// In-memory `EntityStore`.
///
/// Rows are kept ordered by id, so `fetch_all` is deterministic and matches
/// insertion order when ids are store-assigned.
#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                rows: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Build a store from a JSON array of [`SeedRecord`]s.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        let seeds: Vec<SeedRecord> = serde_json::from_str(json)
            .map_err(|e| StoreError::new(format!("Failed to parse seed data: {}", e)))?;

        let store = Self::new();
        {
            let mut inner = store
                .inner
                .try_write()
                .map_err(|_| StoreError::new("Store lock unavailable"))?;
            for seed in seeds {
                if inner.rows.contains_key(&seed.id) {
                    return Err(StoreError::new(format!("Duplicate seed id {}", seed.id)));
                }
                inner.next_id = inner.next_id.max(seed.id + 1);
                inner.rows.insert(
                    seed.id,
                    StoredRow {
                        owner: seed.owner.map(EntityId),
                        fields: seed.fields,
                    },
                );
            }
        }
        Ok(store)
    }

    /// Insert a new entity and return its store-assigned id.
    pub async fn insert(&self, owner: Option<EntityId>, fields: Fields) -> EntityId {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id += 1;
        inner.rows.insert(id, StoredRow { owner, fields });
        EntityId(id)
    }

    /// Insert with a caller-chosen id. Fails on a duplicate.
    pub async fn insert_with_id(
        &self,
        id: EntityId,
        owner: Option<EntityId>,
        fields: Fields,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.rows.contains_key(&id.0) {
            return Err(StoreError::new(format!("Entity {} already exists", id)));
        }
        inner.next_id = inner.next_id.max(id.0 + 1);
        inner.rows.insert(id.0, StoredRow { owner, fields });
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.rows.is_empty()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn fetch_all(&self, filter: OwnerFilter) -> StoreResult<Vec<EntityRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .rows
            .iter()
            .filter(|(_, row)| match filter {
                OwnerFilter::All => true,
                OwnerFilter::Owner(owner) => row.owner == Some(owner),
            })
            .map(|(id, row)| EntityRecord::new(*id, row.fields.clone()))
            .collect())
    }

    async fn fetch_one(&self, id: EntityId) -> StoreResult<Option<EntityRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .rows
            .get(&id.0)
            .map(|row| EntityRecord::new(id, row.fields.clone())))
    }

    async fn update(&self, id: EntityId, fields: &Fields) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;
        match inner.rows.get_mut(&id.0) {
            Some(row) => {
                for (name, value) in fields {
                    row.fields.insert(name.clone(), value.clone());
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, id: EntityId) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;
        Ok(if inner.rows.remove(&id.0).is_some() {
            1
        } else {
            0
        })
    }
}
