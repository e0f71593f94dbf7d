//! Recording doubles for the platform and media collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use pb_coord::CoordConfig;
use pb_namespace::{ExistenceHooks, NamespaceConfig, NamespaceHandler};
use pb_store::InMemoryPuppetStore;
use pb_types::{
    EmoteEntity, EmoteKey, GroupEntity, Profile, PuppetAccount, RemoteEmote, RemoteGroup,
    RemoteKey, RemoteRoom, RemoteUser, RoomEntity, UserEntity,
};

use crate::emote::EmotePlatform;
use crate::error::{SyncError, SyncResult};
use crate::group::GroupPlatform;
use crate::media::{MediaClient, MediaError};
use crate::profile::ProfileChanges;
use crate::room::RoomPlatform;
use crate::user::UserPlatform;

pub fn config() -> CoordConfig {
    CoordConfig::default()
}

pub fn isolated() -> Arc<NamespaceHandler> {
    Arc::new(NamespaceHandler::new(
        NamespaceConfig::default(),
        Arc::new(InMemoryPuppetStore::with_puppets([
            PuppetAccount::new(1, "@alice:home"),
            PuppetAccount::new(2, "@bob:home"),
        ])),
        ExistenceHooks::none(),
    ))
}

/// Puppets 1 and 2 share the global namespace, puppet 3 is isolated.
pub fn shared() -> Arc<NamespaceHandler> {
    Arc::new(NamespaceHandler::new(
        NamespaceConfig::global(),
        Arc::new(InMemoryPuppetStore::with_puppets([
            PuppetAccount::new(1, "@alice:home").global(),
            PuppetAccount::new(2, "@bob:home").global().relay(),
            PuppetAccount::new(3, "@carol:home"),
        ])),
        ExistenceHooks::none(),
    ))
}

#[derive(Default)]
pub struct MockMedia {
    served: HashMap<String, Bytes>,
    fetches: AtomicUsize,
    uploads: AtomicUsize,
    fail_uploads: AtomicBool,
}

impl MockMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(mut self, url: &str, bytes: &'static [u8]) -> Self {
        self.served.insert(url.to_string(), Bytes::from_static(bytes));
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaClient for MockMedia {
    async fn fetch(&self, url: &str) -> Result<Bytes, MediaError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.served.get(url).cloned().ok_or_else(|| MediaError::Fetch {
            url: url.to_string(),
            reason: "404".into(),
        })
    }

    async fn upload(
        &self,
        _data: Bytes,
        _mime_type: Option<&str>,
        _filename: Option<&str>,
    ) -> Result<String, MediaError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(MediaError::Upload("refused".into()));
        }
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("mxc://home/{n}"))
    }
}

/// Implements every platform trait and records each call as a line.
#[derive(Default)]
pub struct RecordingPlatform {
    calls: Mutex<Vec<String>>,
    next_id: AtomicUsize,
    fail_updates: AtomicBool,
}

impl RecordingPlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(' ').next() == Some(op))
            .count()
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("lock poisoned").push(call);
    }

    fn id(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn update(&self, op: &str, local_id: &str, changes: &ProfileChanges) -> SyncResult<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(SyncError::platform("update refused"));
        }
        self.record(format!("{op} {local_id} {}", changes.fields().join(",")));
        Ok(())
    }
}

#[async_trait]
impl RoomPlatform for RecordingPlatform {
    async fn create_room(&self, key: &RemoteKey, _room: &RemoteRoom, _profile: &Profile) -> SyncResult<String> {
        // let concurrent callers interleave
        tokio::task::yield_now().await;
        self.record(format!("create_room {key}"));
        Ok(format!("!r{}:home", self.id()))
    }

    async fn update_room(&self, room: &RoomEntity, changes: &ProfileChanges) -> SyncResult<()> {
        self.update("update_room", &room.local_id, changes)
    }
}

#[async_trait]
impl UserPlatform for RecordingPlatform {
    async fn register_user(&self, localpart: &str, _user: &RemoteUser, _profile: &Profile) -> SyncResult<String> {
        tokio::task::yield_now().await;
        self.record(format!("register_user {localpart}"));
        Ok(format!("@{localpart}:home"))
    }

    async fn update_user(&self, user: &UserEntity, changes: &ProfileChanges) -> SyncResult<()> {
        self.update("update_user", &user.local_id, changes)
    }
}

#[async_trait]
impl GroupPlatform for RecordingPlatform {
    async fn create_group(&self, key: &RemoteKey, _group: &RemoteGroup, _profile: &Profile) -> SyncResult<String> {
        self.record(format!("create_group {key}"));
        Ok(format!("+g{}:home", self.id()))
    }

    async fn update_group(&self, group: &GroupEntity, changes: &ProfileChanges) -> SyncResult<()> {
        self.update("update_group", &group.local_id, changes)
    }

    async fn add_room(&self, group: &GroupEntity, room_id: &str) -> SyncResult<()> {
        self.record(format!("add_room {} {room_id}", group.local_id));
        Ok(())
    }

    async fn remove_room(&self, group: &GroupEntity, room_id: &str) -> SyncResult<()> {
        self.record(format!("remove_room {} {room_id}", group.local_id));
        Ok(())
    }
}

#[async_trait]
impl EmotePlatform for RecordingPlatform {
    async fn create_emote(&self, key: &EmoteKey, _emote: &RemoteEmote, _profile: &Profile) -> SyncResult<String> {
        self.record(format!("create_emote {key}"));
        Ok(format!("emote-{}", self.id()))
    }

    async fn update_emote(&self, emote: &EmoteEntity, changes: &ProfileChanges) -> SyncResult<()> {
        self.update("update_emote", &emote.local_id, changes)
    }
}
