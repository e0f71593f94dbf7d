use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use pb_types::{EntityKey, PuppetAccount, PuppetId, SyncedEntity};

use crate::error::{StoreError, StoreResult};
use crate::traits::{EntityStore, PuppetStore};

/// In-memory, HashMap-based entity store.
///
/// Intended for tests and embedding. Entities are cloned on read and write.
/// The number of successful writes is tracked so callers can assert on write
/// amplification.
pub struct InMemoryEntityStore<E: SyncedEntity> {
    entities: RwLock<HashMap<E::Key, E>>,
    writes: AtomicUsize,
}

impl<E: SyncedEntity> InMemoryEntityStore<E> {
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of entities currently stored.
    pub fn len(&self) -> usize {
        self.entities.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.read().expect("lock poisoned").is_empty()
    }

    /// Number of successful `upsert` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.entities.write().expect("lock poisoned").clear();
    }
}

impl<E: SyncedEntity> Default for InMemoryEntityStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: SyncedEntity> EntityStore<E> for InMemoryEntityStore<E> {
    async fn get(&self, key: &E::Key) -> StoreResult<Option<E>> {
        let map = self.entities.read().expect("lock poisoned");
        Ok(map.get(key).cloned())
    }

    async fn get_by_local_id(&self, local_id: &str) -> StoreResult<Option<E>> {
        let map = self.entities.read().expect("lock poisoned");
        Ok(map.values().find(|e| e.local_id() == local_id).cloned())
    }

    async fn list_by_puppet(&self, puppet: PuppetId) -> StoreResult<Vec<E>> {
        let map = self.entities.read().expect("lock poisoned");
        let mut entities: Vec<E> = map
            .values()
            .filter(|e| e.key().puppet() == puppet)
            .cloned()
            .collect();
        entities.sort_by(|a, b| a.local_id().cmp(b.local_id()));
        Ok(entities)
    }

    async fn upsert(&self, entity: &E) -> StoreResult<()> {
        let mut map = self.entities.write().expect("lock poisoned");
        if let Some(existing) = map.get(entity.key()) {
            if existing.local_id() != entity.local_id() {
                return Err(StoreError::LocalIdChanged {
                    key: entity.key().to_string(),
                    old: existing.local_id().to_string(),
                    new: entity.local_id().to_string(),
                });
            }
        }
        if let Some(other) = map
            .values()
            .find(|e| e.local_id() == entity.local_id() && e.key() != entity.key())
        {
            return Err(StoreError::DuplicateLocalId {
                local_id: entity.local_id().to_string(),
                existing: other.key().to_string(),
            });
        }
        map.insert(entity.key().clone(), entity.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(kind = %E::KIND, key = %entity.key(), "entity stored");
        Ok(())
    }

    async fn delete(&self, entity: &E) -> StoreResult<bool> {
        let mut map = self.entities.write().expect("lock poisoned");
        Ok(map.remove(entity.key()).is_some())
    }
}

impl<E: SyncedEntity> std::fmt::Debug for InMemoryEntityStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEntityStore")
            .field("kind", &E::KIND)
            .field("entity_count", &self.len())
            .finish()
    }
}

/// In-memory puppet registry.
#[derive(Debug, Default)]
pub struct InMemoryPuppetStore {
    puppets: RwLock<BTreeMap<PuppetId, PuppetAccount>>,
}

impl InMemoryPuppetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry pre-populated with `puppets`.
    pub fn with_puppets(puppets: impl IntoIterator<Item = PuppetAccount>) -> Self {
        let store = Self::new();
        for puppet in puppets {
            store.insert(puppet);
        }
        store
    }

    /// Register or replace a puppet.
    pub fn insert(&self, puppet: PuppetAccount) {
        self.puppets
            .write()
            .expect("lock poisoned")
            .insert(puppet.puppet_id, puppet);
    }

    /// Remove a puppet. Returns the removed account, if any.
    pub fn remove(&self, puppet: PuppetId) -> Option<PuppetAccount> {
        self.puppets.write().expect("lock poisoned").remove(&puppet)
    }
}

#[async_trait]
impl PuppetStore for InMemoryPuppetStore {
    async fn get(&self, puppet: PuppetId) -> StoreResult<Option<PuppetAccount>> {
        Ok(self
            .puppets
            .read()
            .expect("lock poisoned")
            .get(&puppet)
            .cloned())
    }

    async fn list(&self) -> StoreResult<Vec<PuppetAccount>> {
        Ok(self
            .puppets
            .read()
            .expect("lock poisoned")
            .values()
            .cloned()
            .collect())
    }
}
