use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use pb_coord::{CoordConfig, KeyedLock, TtlCache};
use pb_crypto::ContentHasher;
use pb_namespace::NamespaceHandler;
use pb_store::EntityStore;
use pb_types::{EntityKey, EntityKind, Profile, PuppetId, RemoteData, SyncedEntity};
use tracing::{debug, info, warn};

use crate::error::SyncResult;
use crate::hooks::{validate_override, CreateHook, OverrideOutcome};
use crate::media::{AvatarProcessor, MediaClient};
use crate::profile::ProfileChanges;

/// Storage key type of a [`SyncKind`].
pub type KindKey<K> = <<K as SyncKind>::Entity as SyncedEntity>::Key;

/// The per-kind half of a [`Synchronizer`]: how an entity of this kind is
/// created and updated on the home network, and how its kind-specific
/// fields are merged.
#[async_trait]
pub trait SyncKind: Send + Sync + 'static {
    type Entity: SyncedEntity;
    type Data: RemoteData<Key = <Self::Entity as SyncedEntity>::Key>;

    /// Hasher used for the avatar of this kind.
    const HASHER: ContentHasher = ContentHasher::AVATAR;

    /// Create the home-network resource. `key` is the storage key.
    async fn create(
        &self,
        key: &<Self::Entity as SyncedEntity>::Key,
        data: &Self::Data,
        profile: &Profile,
    ) -> SyncResult<String>;

    fn build(
        &self,
        key: <Self::Entity as SyncedEntity>::Key,
        local_id: String,
        profile: Profile,
        data: &Self::Data,
    ) -> Self::Entity;

    /// Push changed profile fields to the home-network resource.
    async fn update(&self, entity: &Self::Entity, changes: &ProfileChanges) -> SyncResult<()>;

    /// Merge the non-profile fields of `data` into `entity`. Returns whether
    /// anything changed.
    async fn merge_extra(&self, _entity: &mut Self::Entity, _data: &Self::Data) -> SyncResult<bool> {
        Ok(false)
    }
}

/// Resolve-or-create for one entity kind.
///
/// Every read and write is keyed by the *storage* key: the request key with
/// its puppet replaced by [`NamespaceHandler::storage_puppet_id`]. Creation
/// runs under a per-key [`KeyedLock`] guard and re-reads the store after
/// acquiring it, so concurrent callers for the same key create at most once.
/// The record cache is written on every write path.
pub struct Synchronizer<K: SyncKind> {
    kind: K,
    store: Arc<dyn EntityStore<K::Entity>>,
    namespace: Arc<NamespaceHandler>,
    avatars: AvatarProcessor,
    create_hook: Option<Arc<dyn CreateHook<K::Data>>>,
    locks: KeyedLock<KindKey<K>>,
    cache: TtlCache<KindKey<K>, K::Entity>,
}

impl<K: SyncKind> Synchronizer<K> {
    pub fn new(
        kind: K,
        store: Arc<dyn EntityStore<K::Entity>>,
        namespace: Arc<NamespaceHandler>,
        media: Arc<dyn MediaClient>,
        config: &CoordConfig,
    ) -> Self {
        Self {
            kind,
            store,
            namespace,
            avatars: AvatarProcessor::new(media, K::HASHER),
            create_hook: None,
            locks: KeyedLock::new(config.lock_timeout()),
            cache: TtlCache::new(config.cache_ttl()),
        }
    }

    pub fn with_create_hook(mut self, hook: Arc<dyn CreateHook<K::Data>>) -> Self {
        self.create_hook = Some(hook);
        self
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub fn namespace(&self) -> &Arc<NamespaceHandler> {
        &self.namespace
    }

    /// The key `key` is stored under.
    pub async fn storage_key(&self, key: &KindKey<K>) -> SyncResult<KindKey<K>> {
        let puppet = self.namespace.storage_puppet_id(key.puppet()).await?;
        if puppet == key.puppet() {
            Ok(key.clone())
        } else {
            Ok(key.with_puppet(puppet))
        }
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// The stored entity for `key`, waiting for any creation in progress.
    /// Never creates. Failures are logged and reported as absent.
    pub async fn maybe_get(&self, key: &KindKey<K>) -> Option<K::Entity> {
        let result: SyncResult<Option<K::Entity>> = async {
            let skey = self.storage_key(key).await?;
            self.locks.wait(&skey).await;
            self.read(&skey).await
        }
        .await;
        absent_on_error(result, "maybe_get")
    }

    pub async fn maybe_get_local_id(&self, key: &KindKey<K>) -> Option<String> {
        self.maybe_get(key)
            .await
            .map(|entity| entity.local_id().to_string())
    }

    /// Reverse lookup by home-network id.
    pub async fn get_by_local_id(&self, local_id: &str) -> Option<K::Entity> {
        let found = absent_on_error(
            self.store.get_by_local_id(local_id).await.map_err(Into::into),
            "get_by_local_id",
        )?;
        self.cache.set(found.key().clone(), found.clone());
        Some(found)
    }

    /// The storage key of the entity behind a home-network id.
    pub async fn parts_from_local_id(&self, local_id: &str) -> Option<KindKey<K>> {
        self.get_by_local_id(local_id)
            .await
            .map(|entity| entity.key().clone())
    }

    /// Every entity stored for `puppet`, or for the shared bucket if `puppet`
    /// is a global-namespace puppet.
    pub async fn list_by_puppet(&self, puppet: PuppetId) -> SyncResult<Vec<K::Entity>> {
        let storage = self.namespace.storage_puppet_id(puppet).await?;
        Ok(self.store.list_by_puppet(storage).await?)
    }

    // -----------------------------------------------------------------------
    // Synchronization
    // -----------------------------------------------------------------------

    /// Bring the stored entity for `data` up to date, creating it if needed.
    /// Returns the entity and whether this call created it.
    pub async fn resolve_or_create(&self, data: K::Data) -> SyncResult<(K::Entity, bool)> {
        let skey = self.storage_key(&data.request_key()).await?;
        let _guard = self.locks.acquire(skey.clone()).await;
        match self.read(&skey).await? {
            Some(existing) => Ok((self.refresh(existing, &data).await?, false)),
            None => Ok((self.create(skey, data).await?, true)),
        }
    }

    /// Like [`resolve_or_create`](Self::resolve_or_create) but never creates.
    pub async fn resolve(&self, data: K::Data) -> SyncResult<Option<K::Entity>> {
        let skey = self.storage_key(&data.request_key()).await?;
        let _guard = self.locks.acquire(skey.clone()).await;
        match self.read(&skey).await? {
            Some(existing) => Ok(Some(self.refresh(existing, &data).await?)),
            None => {
                debug!(kind = %kind_of::<K>(), key = %skey, "not found, not creating");
                Ok(None)
            }
        }
    }

    pub async fn delete(&self, key: &KindKey<K>) -> SyncResult<bool> {
        let skey = self.storage_key(key).await?;
        let _guard = self.locks.acquire(skey.clone()).await;
        let Some(entity) = self.read(&skey).await? else {
            return Ok(false);
        };
        self.cache.remove(&skey);
        let removed = self.store.delete(&entity).await?;
        self.namespace.invalidate(kind_of::<K>(), skey.remote_id());
        debug!(kind = %kind_of::<K>(), key = %skey, "deleted");
        Ok(removed)
    }

    /// Drop every entity stored under `puppet` (a storage puppet id), e.g.
    /// after the puppet was deleted.
    pub async fn delete_for_puppet(&self, puppet: PuppetId) -> SyncResult<usize> {
        let mut removed = 0;
        for entity in self.store.list_by_puppet(puppet).await? {
            if self.store.delete(&entity).await? {
                removed += 1;
            }
        }
        self.cache.remove_where(|key, _| key.puppet() == puppet);
        info!(kind = %kind_of::<K>(), %puppet, removed, "deleted entities of puppet");
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn read(&self, skey: &KindKey<K>) -> SyncResult<Option<K::Entity>> {
        if let Some(hit) = self.cache.get(skey) {
            return Ok(Some(hit));
        }
        let found = self.store.get(skey).await?;
        if let Some(entity) = &found {
            self.cache.set(skey.clone(), entity.clone());
        }
        Ok(found)
    }

    async fn create(&self, skey: KindKey<K>, data: K::Data) -> SyncResult<K::Entity> {
        let data = self.run_create_hook(data).await;
        let update = data.profile_update();
        let mut profile = update.to_initial_profile();
        if let Some(avatar) = self.avatars.process(&profile, &update).await {
            avatar.apply_to(&mut profile);
        }

        let local_id = self.kind.create(&skey, &data, &profile).await?;
        let entity = self.kind.build(skey.clone(), local_id, profile, &data);
        self.store.upsert(&entity).await?;
        self.cache.set(skey, entity.clone());
        info!(
            kind = %kind_of::<K>(),
            key = %entity.key(),
            local_id = entity.local_id(),
            "created"
        );
        Ok(entity)
    }

    async fn refresh(&self, mut entity: K::Entity, data: &K::Data) -> SyncResult<K::Entity> {
        let update = data.profile_update();
        let mut changes = ProfileChanges::between(entity.profile(), &update);
        changes.avatar = self.avatars.process(entity.profile(), &update).await;

        if !changes.is_empty() {
            self.kind.update(&entity, &changes).await?;
            changes.apply_to(entity.profile_mut());
        }
        let extra = self.kind.merge_extra(&mut entity, data).await?;
        if changes.is_empty() && !extra {
            return Ok(entity);
        }

        self.store.upsert(&entity).await?;
        self.cache.set(entity.key().clone(), entity.clone());
        debug!(
            kind = %kind_of::<K>(),
            key = %entity.key(),
            fields = ?changes.fields(),
            extra,
            "updated"
        );
        Ok(entity)
    }

    async fn run_create_hook(&self, data: K::Data) -> K::Data {
        let Some(hook) = &self.create_hook else {
            return data;
        };
        let Some(candidate) = hook.on_create(&data).await else {
            return data;
        };
        match validate_override(&data, candidate) {
            OverrideOutcome::Accepted(replacement) => replacement,
            OverrideOutcome::Rejected { reason } => {
                warn!(kind = %kind_of::<K>(), %reason, "ignoring create hook override");
                data
            }
        }
    }
}

fn kind_of<K: SyncKind>() -> EntityKind {
    <K::Entity as SyncedEntity>::KIND
}

fn absent_on_error<T>(result: SyncResult<Option<T>>, op: &'static str) -> Option<T> {
    result.unwrap_or_else(|err| {
        warn!(op, error = %err, "lookup failed");
        None
    })
}

impl<K: SyncKind> fmt::Debug for Synchronizer<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synchronizer")
            .field("kind", &kind_of::<K>())
            .field("cached", &self.cache.len())
            .field("locked", &self.locks.held_count())
            .field("create_hook", &self.create_hook.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::hooks::FnCreateHook;
    use crate::room::{RoomKind, RoomSync};
    use crate::testing::{self, MockMedia, RecordingPlatform};
    use bytes::Bytes;
    use pb_namespace::NamespaceError;
    use pb_store::InMemoryEntityStore;
    use pb_types::{RemoteKey, RemoteRoom, RoomEntity};

    struct Fixture {
        sync: Arc<RoomSync>,
        store: Arc<InMemoryEntityStore<RoomEntity>>,
        platform: Arc<RecordingPlatform>,
        media: Arc<MockMedia>,
    }

    fn fixture_with(namespace: Arc<NamespaceHandler>, media: MockMedia) -> Fixture {
        let store = Arc::new(InMemoryEntityStore::new());
        let platform = RecordingPlatform::new();
        let media = Arc::new(media);
        let sync = RoomSync::new(
            RoomKind::new(platform.clone()),
            store.clone(),
            namespace,
            media.clone(),
            &testing::config(),
        );
        Fixture {
            sync: Arc::new(sync),
            store,
            platform,
            media,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(testing::isolated(), MockMedia::new())
    }

    fn lobby() -> RemoteRoom {
        let mut room = RemoteRoom::new(1, "r1");
        room.name = Some("Lobby".into());
        room.topic = Some("chat".into());
        room
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_create_once() {
        let f = fixture();
        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let sync = Arc::clone(&f.sync);
                tokio::spawn(async move { sync.resolve_or_create(lobby()).await })
            })
            .collect();

        let mut created = 0;
        let mut local_ids = Vec::new();
        for task in tasks {
            let (room, was_created) = task.await.unwrap().unwrap();
            created += usize::from(was_created);
            local_ids.push(room.local_id);
        }
        assert_eq!(created, 1);
        assert!(local_ids.iter().all(|id| id == &local_ids[0]));
        assert_eq!(f.platform.count("create_room"), 1);
        assert_eq!(f.store.write_count(), 1);
    }

    #[tokio::test]
    async fn identical_resync_writes_nothing() {
        let f = fixture();
        let mut room = lobby();
        room.avatar_buffer = Some(Bytes::from_static(b"png"));

        let (first, created) = f.sync.resolve_or_create(room.clone()).await.unwrap();
        assert!(created);
        assert_eq!(first.profile.name.as_deref(), Some("Lobby"));
        assert_eq!(first.profile.avatar_mxc.as_deref(), Some("mxc://home/1"));

        let (second, created) = f.sync.resolve_or_create(room).await.unwrap();
        assert!(!created);
        assert_eq!(second, first);
        assert_eq!(f.store.write_count(), 1);
        assert_eq!(f.platform.count("update_room"), 0);
        assert_eq!(f.media.uploads(), 1);
    }

    #[tokio::test]
    async fn changed_fields_are_pushed_and_persisted() {
        let f = fixture();
        let (room, _) = f.sync.resolve_or_create(lobby()).await.unwrap();

        let mut renamed = RemoteRoom::new(1, "r1");
        renamed.name = Some("Hall".into());
        let (updated, created) = f.sync.resolve_or_create(renamed).await.unwrap();
        assert!(!created);
        assert_eq!(updated.profile.name.as_deref(), Some("Hall"));
        // unsupplied topic is kept
        assert_eq!(updated.profile.topic.as_deref(), Some("chat"));
        assert_eq!(f.platform.calls().last().unwrap(), &format!("update_room {} name", room.local_id));
        assert_eq!(f.store.write_count(), 2);

        let stored = f.sync.maybe_get(&RemoteKey::new(1, "r1")).await.unwrap();
        assert_eq!(stored.profile.name.as_deref(), Some("Hall"));
    }

    #[tokio::test]
    async fn same_avatar_under_new_url_uploads_once() {
        let media = MockMedia::new()
            .serve("https://remote/x.png", b"bytes")
            .serve("https://remote/y.png", b"bytes");
        let f = fixture_with(testing::isolated(), media);

        let mut room = RemoteRoom::new(1, "r1");
        room.avatar_url = Some("https://remote/x.png".into());
        let (first, _) = f.sync.resolve_or_create(room.clone()).await.unwrap();

        room.avatar_url = Some("https://remote/y.png".into());
        let (second, _) = f.sync.resolve_or_create(room).await.unwrap();

        assert_eq!(f.media.uploads(), 1);
        assert_eq!(second.profile.avatar_hash, first.profile.avatar_hash);
        assert_eq!(second.profile.avatar_url.as_deref(), Some("https://remote/x.png"));
        assert_eq!(f.store.write_count(), 1);
    }

    #[tokio::test]
    async fn failed_upload_is_retried_next_sync() {
        let f = fixture_with(
            testing::isolated(),
            MockMedia::new().serve("https://remote/a.png", b"img"),
        );
        f.media.fail_uploads(true);
        let mut room = RemoteRoom::new(1, "r1");
        room.avatar_url = Some("https://remote/a.png".into());

        let (created, _) = f.sync.resolve_or_create(room.clone()).await.unwrap();
        assert_eq!(created.profile.avatar_hash, None);

        f.media.fail_uploads(false);
        let (retried, _) = f.sync.resolve_or_create(room).await.unwrap();
        assert!(retried.profile.avatar_hash.is_some());
        assert_eq!(f.platform.count("update_room"), 1);
    }

    #[tokio::test]
    async fn failed_platform_update_leaves_store_untouched() {
        let f = fixture();
        f.sync.resolve_or_create(lobby()).await.unwrap();
        f.platform.fail_updates(true);

        let mut renamed = RemoteRoom::new(1, "r1");
        renamed.name = Some("Hall".into());
        let err = f.sync.resolve_or_create(renamed).await.unwrap_err();
        assert!(matches!(err, SyncError::Platform(_)));

        let stored = f.sync.maybe_get(&RemoteKey::new(1, "r1")).await.unwrap();
        assert_eq!(stored.profile.name.as_deref(), Some("Lobby"));
        assert_eq!(f.store.write_count(), 1);
    }

    #[tokio::test]
    async fn resolve_never_creates() {
        let f = fixture();
        assert!(f.sync.resolve(lobby()).await.unwrap().is_none());
        assert_eq!(f.platform.count("create_room"), 0);

        f.sync.resolve_or_create(lobby()).await.unwrap();
        let mut renamed = lobby();
        renamed.name = Some("Hall".into());
        let found = f.sync.resolve(renamed).await.unwrap().unwrap();
        assert_eq!(found.profile.name.as_deref(), Some("Hall"));
    }

    #[tokio::test]
    async fn lookups() {
        let f = fixture();
        let key = RemoteKey::new(1, "r1");
        assert!(f.sync.maybe_get(&key).await.is_none());

        let (room, _) = f.sync.resolve_or_create(lobby()).await.unwrap();
        assert_eq!(f.sync.maybe_get_local_id(&key).await, Some(room.local_id.clone()));
        assert_eq!(f.sync.get_by_local_id(&room.local_id).await, Some(room.clone()));
        assert_eq!(f.sync.parts_from_local_id(&room.local_id).await, Some(key));
        assert!(f.sync.get_by_local_id("!nope:home").await.is_none());
        // puppets are isolated
        assert!(f.sync.maybe_get(&RemoteKey::new(2, "r1")).await.is_none());
    }

    #[tokio::test]
    async fn global_puppets_share_one_record() {
        let f = fixture_with(testing::shared(), MockMedia::new());
        let (room, created) = f.sync.resolve_or_create(RemoteRoom::new(1, "r")).await.unwrap();
        assert!(created);
        assert_eq!(room.key, RemoteKey::new(PuppetId::GLOBAL, "r"));
        assert_eq!(room.owner_puppet, PuppetId::new(1));

        let (same, created) = f.sync.resolve_or_create(RemoteRoom::new(2, "r")).await.unwrap();
        assert!(!created);
        assert_eq!(same.local_id, room.local_id);

        // puppet 3 is isolated and gets its own room
        let (own, created) = f.sync.resolve_or_create(RemoteRoom::new(3, "r")).await.unwrap();
        assert!(created);
        assert_eq!(own.key, RemoteKey::new(3, "r"));
        assert_eq!(f.platform.count("create_room"), 2);
    }

    #[tokio::test]
    async fn shared_bucket_requires_global_namespace() {
        let f = fixture();
        let err = f
            .sync
            .resolve_or_create(RemoteRoom::new(PuppetId::GLOBAL, "r"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Namespace(NamespaceError::GlobalNamespaceDisabled)
        ));
        assert!(f.sync.maybe_get(&RemoteKey::new(PuppetId::GLOBAL, "r")).await.is_none());
    }

    #[tokio::test]
    async fn create_hook_override_is_validated() {
        let f = fixture();
        let sync = RoomSync::new(
            RoomKind::new(f.platform.clone()),
            f.store.clone(),
            testing::isolated(),
            f.media.clone(),
            &testing::config(),
        )
        .with_create_hook(Arc::new(FnCreateHook(|room: &RemoteRoom| {
            let mut out = if room.room_id == "bad" {
                RemoteRoom::new(room.puppet_id, "someone-else")
            } else {
                room.clone()
            };
            out.name = Some("From hook".into());
            Some(out)
        })));

        let (good, _) = sync.resolve_or_create(RemoteRoom::new(1, "good")).await.unwrap();
        assert_eq!(good.profile.name.as_deref(), Some("From hook"));

        let mut bad = RemoteRoom::new(1, "bad");
        bad.name = Some("Original".into());
        let (kept, _) = sync.resolve_or_create(bad).await.unwrap();
        assert_eq!(kept.key, RemoteKey::new(1, "bad"));
        assert_eq!(kept.profile.name.as_deref(), Some("Original"));
    }

    #[tokio::test]
    async fn delete_and_delete_for_puppet() {
        let f = fixture();
        for id in ["a", "b", "c"] {
            f.sync.resolve_or_create(RemoteRoom::new(1, id)).await.unwrap();
        }
        f.sync.resolve_or_create(RemoteRoom::new(2, "a")).await.unwrap();

        assert!(f.sync.delete(&RemoteKey::new(1, "a")).await.unwrap());
        assert!(!f.sync.delete(&RemoteKey::new(1, "a")).await.unwrap());
        assert!(f.sync.maybe_get(&RemoteKey::new(1, "a")).await.is_none());

        assert_eq!(f.sync.delete_for_puppet(PuppetId::new(1)).await.unwrap(), 2);
        assert!(f.sync.maybe_get(&RemoteKey::new(1, "b")).await.is_none());
        assert!(f.sync.maybe_get(&RemoteKey::new(2, "a")).await.is_some());
        assert_eq!(f.store.len(), 1);
    }
}
