use async_trait::async_trait;
use pb_types::{PuppetAccount, PuppetId, SyncedEntity};

use crate::error::StoreResult;

/// Durable store of synced entities of one kind.
///
/// Each call is treated as atomic. Callers never rely on transactions spanning
/// several calls. Implementations must satisfy:
/// - `local_id` is unique across the store.
/// - `local_id` never changes once an entity is written.
/// - Lookups of missing entities return `Ok(None)`, never an error.
#[async_trait]
pub trait EntityStore<E: SyncedEntity>: Send + Sync {
    /// Read an entity by its storage key.
    async fn get(&self, key: &E::Key) -> StoreResult<Option<E>>;

    /// Reverse lookup by home-network id.
    async fn get_by_local_id(&self, local_id: &str) -> StoreResult<Option<E>>;

    /// All entities stored under a puppet (or under the shared bucket).
    async fn list_by_puppet(&self, puppet: PuppetId) -> StoreResult<Vec<E>>;

    /// Insert or replace the entity stored under its key.
    async fn upsert(&self, entity: &E) -> StoreResult<()>;

    /// Delete an entity. Returns `true` if it existed.
    async fn delete(&self, entity: &E) -> StoreResult<bool>;
}

/// Read access to provisioned puppets.
#[async_trait]
pub trait PuppetStore: Send + Sync {
    async fn get(&self, puppet: PuppetId) -> StoreResult<Option<PuppetAccount>>;

    async fn list(&self) -> StoreResult<Vec<PuppetAccount>>;

    /// Puppets whose entities live in the global namespace.
    async fn list_global(&self) -> StoreResult<Vec<PuppetAccount>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|p| p.is_global_namespace)
            .collect())
    }
}
