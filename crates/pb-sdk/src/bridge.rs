use std::sync::Arc;

use pb_coord::MessageDeduplicator;
use pb_namespace::{ExistenceHooks, NamespaceHandler};
use pb_store::{EntityStore, InMemoryEntityStore, InMemoryPuppetStore, PuppetStore};
use pb_sync::{
    CreateHook, EmoteKind, EmotePlatform, EmoteSync, GroupKind, GroupPlatform, GroupSync,
    MediaClient, RoomKind, RoomPlatform, RoomSync, UserKind, UserPlatform, UserSync,
};
use pb_types::{
    EmoteEntity, GroupEntity, PuppetId, RemoteEmote, RemoteGroup, RemoteRoom, RemoteUser,
    RoomEntity, UserEntity,
};
use tracing::info;

use crate::config::BridgeConfig;
use crate::error::{SdkError, SdkResult};

/// The assembled synchronization core: one namespace handler shared by the
/// four synchronizers, plus the outbound-echo deduplicator.
pub struct Bridge {
    config: BridgeConfig,
    puppets: Arc<dyn PuppetStore>,
    namespace: Arc<NamespaceHandler>,
    rooms: RoomSync,
    users: UserSync,
    groups: GroupSync,
    emotes: EmoteSync,
    dedupe: MessageDeduplicator,
}

impl Bridge {
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::default()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn puppets(&self) -> &Arc<dyn PuppetStore> {
        &self.puppets
    }

    pub fn namespace(&self) -> &Arc<NamespaceHandler> {
        &self.namespace
    }

    pub fn rooms(&self) -> &RoomSync {
        &self.rooms
    }

    pub fn users(&self) -> &UserSync {
        &self.users
    }

    pub fn groups(&self) -> &GroupSync {
        &self.groups
    }

    pub fn emotes(&self) -> &EmoteSync {
        &self.emotes
    }

    pub fn dedupe(&self) -> &MessageDeduplicator {
        &self.dedupe
    }

    /// A puppet was provisioned: cached membership sets may now be incomplete.
    pub fn puppet_added(&self, puppet: PuppetId) {
        self.namespace.clear();
        info!(%puppet, "puppet added, membership cache cleared");
    }

    /// A puppet was removed: drop the entities stored under it and every
    /// membership set mentioning it. Entities in the shared bucket stay.
    pub async fn puppet_removed(&self, puppet: PuppetId) -> SdkResult<usize> {
        let removed = self.rooms.delete_for_puppet(puppet).await?
            + self.users.delete_for_puppet(puppet).await?
            + self.groups.delete_for_puppet(puppet).await?
            + self.emotes.delete_for_puppet(puppet).await?;
        let sets = self.namespace.invalidate_puppet(puppet);
        info!(%puppet, removed, membership_sets = sets, "puppet removed");
        Ok(removed)
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("namespace", &self.namespace)
            .field("rooms", &self.rooms)
            .field("users", &self.users)
            .field("groups", &self.groups)
            .field("emotes", &self.emotes)
            .finish()
    }
}

/// Collects the collaborators of a [`Bridge`]. Platforms and the media
/// client are required; stores default to in-memory ones.
#[derive(Default)]
pub struct BridgeBuilder {
    config: BridgeConfig,
    puppets: Option<Arc<dyn PuppetStore>>,
    hooks: ExistenceHooks,
    media: Option<Arc<dyn MediaClient>>,
    room_platform: Option<Arc<dyn RoomPlatform>>,
    user_platform: Option<Arc<dyn UserPlatform>>,
    group_platform: Option<Arc<dyn GroupPlatform>>,
    emote_platform: Option<Arc<dyn EmotePlatform>>,
    room_store: Option<Arc<dyn EntityStore<RoomEntity>>>,
    user_store: Option<Arc<dyn EntityStore<UserEntity>>>,
    group_store: Option<Arc<dyn EntityStore<GroupEntity>>>,
    emote_store: Option<Arc<dyn EntityStore<EmoteEntity>>>,
    room_hook: Option<Arc<dyn CreateHook<RemoteRoom>>>,
    user_hook: Option<Arc<dyn CreateHook<RemoteUser>>>,
    group_hook: Option<Arc<dyn CreateHook<RemoteGroup>>>,
    emote_hook: Option<Arc<dyn CreateHook<RemoteEmote>>>,
}

impl BridgeBuilder {
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn puppets(mut self, puppets: Arc<dyn PuppetStore>) -> Self {
        self.puppets = Some(puppets);
        self
    }

    pub fn existence_hooks(mut self, hooks: ExistenceHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn media(mut self, media: Arc<dyn MediaClient>) -> Self {
        self.media = Some(media);
        self
    }

    /// Use one collaborator for every platform side effect.
    pub fn platform<P>(self, platform: Arc<P>) -> Self
    where
        P: RoomPlatform + UserPlatform + GroupPlatform + EmotePlatform + 'static,
    {
        self.room_platform(platform.clone())
            .user_platform(platform.clone())
            .group_platform(platform.clone())
            .emote_platform(platform)
    }

    pub fn room_platform(mut self, platform: Arc<dyn RoomPlatform>) -> Self {
        self.room_platform = Some(platform);
        self
    }

    pub fn user_platform(mut self, platform: Arc<dyn UserPlatform>) -> Self {
        self.user_platform = Some(platform);
        self
    }

    pub fn group_platform(mut self, platform: Arc<dyn GroupPlatform>) -> Self {
        self.group_platform = Some(platform);
        self
    }

    pub fn emote_platform(mut self, platform: Arc<dyn EmotePlatform>) -> Self {
        self.emote_platform = Some(platform);
        self
    }

    pub fn room_store(mut self, store: Arc<dyn EntityStore<RoomEntity>>) -> Self {
        self.room_store = Some(store);
        self
    }

    pub fn user_store(mut self, store: Arc<dyn EntityStore<UserEntity>>) -> Self {
        self.user_store = Some(store);
        self
    }

    pub fn group_store(mut self, store: Arc<dyn EntityStore<GroupEntity>>) -> Self {
        self.group_store = Some(store);
        self
    }

    pub fn emote_store(mut self, store: Arc<dyn EntityStore<EmoteEntity>>) -> Self {
        self.emote_store = Some(store);
        self
    }

    pub fn room_create_hook(mut self, hook: Arc<dyn CreateHook<RemoteRoom>>) -> Self {
        self.room_hook = Some(hook);
        self
    }

    pub fn user_create_hook(mut self, hook: Arc<dyn CreateHook<RemoteUser>>) -> Self {
        self.user_hook = Some(hook);
        self
    }

    pub fn group_create_hook(mut self, hook: Arc<dyn CreateHook<RemoteGroup>>) -> Self {
        self.group_hook = Some(hook);
        self
    }

    pub fn emote_create_hook(mut self, hook: Arc<dyn CreateHook<RemoteEmote>>) -> Self {
        self.emote_hook = Some(hook);
        self
    }

    /// Validate the configuration and assemble the bridge.
    pub fn build(self) -> SdkResult<Bridge> {
        self.config.validate()?;
        let media = self.media.ok_or(SdkError::MissingComponent("media client"))?;
        let room_platform = self.room_platform.ok_or(SdkError::MissingComponent("room platform"))?;
        let user_platform = self.user_platform.ok_or(SdkError::MissingComponent("user platform"))?;
        let group_platform = self.group_platform.ok_or(SdkError::MissingComponent("group platform"))?;
        let emote_platform = self.emote_platform.ok_or(SdkError::MissingComponent("emote platform"))?;

        let puppets = self
            .puppets
            .unwrap_or_else(|| Arc::new(InMemoryPuppetStore::new()));
        let namespace = Arc::new(NamespaceHandler::new(
            self.config.namespace.clone(),
            Arc::clone(&puppets),
            self.hooks,
        ));
        let coord = &self.config.coord;

        let mut rooms = RoomSync::new(
            RoomKind::new(room_platform),
            self.room_store.unwrap_or_else(|| Arc::new(InMemoryEntityStore::new())),
            Arc::clone(&namespace),
            Arc::clone(&media),
            coord,
        );
        if let Some(hook) = self.room_hook {
            rooms = rooms.with_create_hook(hook);
        }

        let mut users = UserSync::new(
            UserKind::new(user_platform, self.config.users.localpart_prefix.clone()),
            self.user_store.unwrap_or_else(|| Arc::new(InMemoryEntityStore::new())),
            Arc::clone(&namespace),
            Arc::clone(&media),
            coord,
        );
        if let Some(hook) = self.user_hook {
            users = users.with_create_hook(hook);
        }

        let mut groups = GroupSync::new(
            GroupKind::new(group_platform),
            self.group_store.unwrap_or_else(|| Arc::new(InMemoryEntityStore::new())),
            Arc::clone(&namespace),
            Arc::clone(&media),
            coord,
        );
        if let Some(hook) = self.group_hook {
            groups = groups.with_create_hook(hook);
        }

        let mut emotes = EmoteSync::new(
            EmoteKind::new(emote_platform),
            self.emote_store.unwrap_or_else(|| Arc::new(InMemoryEntityStore::new())),
            Arc::clone(&namespace),
            media,
            coord,
        );
        if let Some(hook) = self.emote_hook {
            emotes = emotes.with_create_hook(hook);
        }

        let dedupe = MessageDeduplicator::new(coord.dedupe_lock_timeout(), coord.dedupe_ttl());
        info!(
            global_namespace = self.config.namespace.enabled,
            "bridge assembled"
        );
        Ok(Bridge {
            config: self.config,
            puppets,
            namespace,
            rooms,
            users,
            groups,
            emotes,
            dedupe,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use pb_namespace::FnExistence;
    use pb_sync::{MediaError, ProfileChanges, SyncResult};
    use pb_types::{EmoteKey, Profile, PuppetAccount, RemoteKey};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Platform {
        next: AtomicUsize,
    }

    impl Platform {
        fn id(&self, sigil: char) -> String {
            format!("{sigil}{}:home", self.next.fetch_add(1, Ordering::SeqCst))
        }
    }

    #[async_trait]
    impl RoomPlatform for Platform {
        async fn create_room(&self, _: &RemoteKey, _: &RemoteRoom, _: &Profile) -> SyncResult<String> {
            Ok(self.id('!'))
        }
        async fn update_room(&self, _: &RoomEntity, _: &ProfileChanges) -> SyncResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl UserPlatform for Platform {
        async fn register_user(&self, localpart: &str, _: &RemoteUser, _: &Profile) -> SyncResult<String> {
            Ok(format!("@{localpart}:home"))
        }
        async fn update_user(&self, _: &UserEntity, _: &ProfileChanges) -> SyncResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl GroupPlatform for Platform {
        async fn create_group(&self, _: &RemoteKey, _: &RemoteGroup, _: &Profile) -> SyncResult<String> {
            Ok(self.id('+'))
        }
        async fn update_group(&self, _: &GroupEntity, _: &ProfileChanges) -> SyncResult<()> {
            Ok(())
        }
        async fn add_room(&self, _: &GroupEntity, _: &str) -> SyncResult<()> {
            Ok(())
        }
        async fn remove_room(&self, _: &GroupEntity, _: &str) -> SyncResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl EmotePlatform for Platform {
        async fn create_emote(&self, _: &EmoteKey, _: &RemoteEmote, _: &Profile) -> SyncResult<String> {
            Ok(self.id(':'))
        }
        async fn update_emote(&self, _: &EmoteEntity, _: &ProfileChanges) -> SyncResult<()> {
            Ok(())
        }
    }

    struct NoMedia;

    #[async_trait]
    impl MediaClient for NoMedia {
        async fn fetch(&self, url: &str) -> Result<Bytes, MediaError> {
            Err(MediaError::Fetch {
                url: url.into(),
                reason: "offline".into(),
            })
        }
        async fn upload(&self, _: Bytes, _: Option<&str>, _: Option<&str>) -> Result<String, MediaError> {
            Err(MediaError::Upload("offline".into()))
        }
    }

    fn shared_config() -> BridgeConfig {
        let mut config = BridgeConfig::default();
        config.namespace.enabled = true;
        config
    }

    fn bridge(config: BridgeConfig) -> Bridge {
        Bridge::builder()
            .config(config)
            .puppets(Arc::new(InMemoryPuppetStore::with_puppets([
                PuppetAccount::new(1, "@alice:home").global().with_remote_account("U1"),
                PuppetAccount::new(2, "@relay:home").global().relay(),
                PuppetAccount::new(3, "@carol:home"),
            ])))
            .existence_hooks(
                ExistenceHooks::none().with_room(FnExistence(|_: PuppetId, id: &str| id == "R")),
            )
            .media(Arc::new(NoMedia))
            .platform(Arc::new(Platform::default()))
            .build()
            .unwrap()
    }

    #[test]
    fn missing_collaborators_are_reported() {
        let err = Bridge::builder().build().unwrap_err();
        assert!(matches!(err, SdkError::MissingComponent("media client")));

        let err = Bridge::builder()
            .media(Arc::new(NoMedia))
            .room_platform(Arc::new(Platform::default()))
            .build()
            .unwrap_err();
        assert!(matches!(err, SdkError::MissingComponent("user platform")));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = BridgeConfig::default();
        config.coord.lock_timeout_ms = 0;
        let err = Bridge::builder()
            .config(config)
            .media(Arc::new(NoMedia))
            .platform(Arc::new(Platform::default()))
            .build()
            .unwrap_err();
        assert!(matches!(err, SdkError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn synchronizers_share_the_namespace() {
        let bridge = bridge(shared_config());
        let (room, created) = bridge
            .rooms()
            .resolve_or_create(RemoteRoom::new(1, "R"))
            .await
            .unwrap();
        assert!(created);
        assert_eq!(room.key.puppet, PuppetId::GLOBAL);

        let (user, _) = bridge
            .users()
            .resolve_or_create(RemoteUser::new(1, "U1"))
            .await
            .unwrap();
        assert_eq!(user.local_id, "@_pb___u1:home");
        assert_eq!(
            bridge.users().parts_from_localpart("_pb___u1").unwrap(),
            Some(RemoteKey::new(PuppetId::GLOBAL, "U1"))
        );

        let blocked = bridge
            .namespace()
            .is_message_blocked(&RemoteRoom::new(2, "R"), &RemoteUser::new(2, "U1"))
            .await
            .unwrap();
        assert!(blocked);
    }

    #[tokio::test]
    async fn removing_a_puppet_drops_its_entities() {
        let bridge = bridge(shared_config());
        bridge.rooms().resolve_or_create(RemoteRoom::new(3, "a")).await.unwrap();
        bridge.users().resolve_or_create(RemoteUser::new(3, "u")).await.unwrap();
        bridge.rooms().resolve_or_create(RemoteRoom::new(1, "R")).await.unwrap();

        assert_eq!(bridge.puppet_removed(PuppetId::new(3)).await.unwrap(), 2);
        assert!(bridge.rooms().maybe_get(&RemoteKey::new(3, "a")).await.is_none());
        // shared entities stay
        assert!(bridge.rooms().maybe_get(&RemoteKey::new(1, "R")).await.is_some());
    }

    #[tokio::test]
    async fn dedupe_uses_configured_lifetimes() {
        let bridge = bridge(BridgeConfig::default());
        bridge.dedupe().lock("!room:home", "@_pb_1_u:home", Some("hi"));
        bridge.dedupe().unlock("!room:home", None, None);
        assert!(bridge.dedupe().dedupe("!room:home", "@_pb_1_u:home", None, Some("hi")).await);
        bridge.puppet_added(PuppetId::new(4));
    }
}
