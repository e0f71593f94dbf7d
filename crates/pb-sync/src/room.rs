use std::sync::Arc;

use async_trait::async_trait;
use pb_types::{Profile, RemoteKey, RemoteRoom, RoomEntity};

use crate::error::SyncResult;
use crate::profile::ProfileChanges;
use crate::synchronizer::{SyncKind, Synchronizer};

/// Home-network side effects for rooms.
#[async_trait]
pub trait RoomPlatform: Send + Sync {
    /// Create the home-network room for `room`, returning its id.
    async fn create_room(&self, key: &RemoteKey, room: &RemoteRoom, profile: &Profile) -> SyncResult<String>;

    async fn update_room(&self, room: &RoomEntity, changes: &ProfileChanges) -> SyncResult<()>;
}

pub struct RoomKind {
    platform: Arc<dyn RoomPlatform>,
}

impl RoomKind {
    pub fn new(platform: Arc<dyn RoomPlatform>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl SyncKind for RoomKind {
    type Entity = RoomEntity;
    type Data = RemoteRoom;

    async fn create(&self, key: &RemoteKey, data: &RemoteRoom, profile: &Profile) -> SyncResult<String> {
        self.platform.create_room(key, data, profile).await
    }

    fn build(&self, key: RemoteKey, local_id: String, profile: Profile, data: &RemoteRoom) -> RoomEntity {
        RoomEntity {
            key,
            local_id,
            profile,
            owner_puppet: data.puppet_id,
            is_direct: data.is_direct.unwrap_or(false),
            group_id: data.group_id.clone(),
            external_url: data.external_url.clone(),
        }
    }

    async fn update(&self, room: &RoomEntity, changes: &ProfileChanges) -> SyncResult<()> {
        self.platform.update_room(room, changes).await
    }

    /// `is_direct`, `group_id` and `external_url` are bookkeeping only and
    /// need no platform call.
    async fn merge_extra(&self, room: &mut RoomEntity, data: &RemoteRoom) -> SyncResult<bool> {
        let mut changed = false;
        if let Some(is_direct) = data.is_direct {
            changed |= set_if_changed(&mut room.is_direct, is_direct);
        }
        if let Some(group_id) = &data.group_id {
            changed |= set_if_changed(&mut room.group_id, Some(group_id.clone()));
        }
        if let Some(url) = &data.external_url {
            changed |= set_if_changed(&mut room.external_url, Some(url.clone()));
        }
        Ok(changed)
    }
}

pub(crate) fn set_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

pub type RoomSync = Synchronizer<RoomKind>;
