use std::sync::Arc;

use async_trait::async_trait;
use pb_types::{GroupEntity, Profile, RemoteGroup, RemoteKey};
use tracing::debug;

use crate::error::SyncResult;
use crate::profile::ProfileChanges;
use crate::synchronizer::{SyncKind, Synchronizer};

/// Home-network side effects for groups.
#[async_trait]
pub trait GroupPlatform: Send + Sync {
    /// Create the group, attaching the rooms listed in `group.room_ids`.
    async fn create_group(&self, key: &RemoteKey, group: &RemoteGroup, profile: &Profile) -> SyncResult<String>;

    async fn update_group(&self, group: &GroupEntity, changes: &ProfileChanges) -> SyncResult<()>;

    async fn add_room(&self, group: &GroupEntity, room_id: &str) -> SyncResult<()>;

    async fn remove_room(&self, group: &GroupEntity, room_id: &str) -> SyncResult<()>;
}

pub struct GroupKind {
    platform: Arc<dyn GroupPlatform>,
}

impl GroupKind {
    pub fn new(platform: Arc<dyn GroupPlatform>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl SyncKind for GroupKind {
    type Entity = GroupEntity;
    type Data = RemoteGroup;

    async fn create(&self, key: &RemoteKey, data: &RemoteGroup, profile: &Profile) -> SyncResult<String> {
        self.platform.create_group(key, data, profile).await
    }

    fn build(&self, key: RemoteKey, local_id: String, profile: Profile, data: &RemoteGroup) -> GroupEntity {
        GroupEntity {
            key,
            local_id,
            profile,
            room_ids: data.room_ids.clone().unwrap_or_default(),
        }
    }

    async fn update(&self, group: &GroupEntity, changes: &ProfileChanges) -> SyncResult<()> {
        self.platform.update_group(group, changes).await
    }

    /// Attach and detach rooms so the group holds exactly the supplied list.
    /// Reordering alone is not a change.
    async fn merge_extra(&self, group: &mut GroupEntity, data: &RemoteGroup) -> SyncResult<bool> {
        let Some(wanted) = &data.room_ids else {
            return Ok(false);
        };
        let added: Vec<&String> = wanted
            .iter()
            .filter(|id| !group.room_ids.contains(id))
            .collect();
        let removed: Vec<String> = group
            .room_ids
            .iter()
            .filter(|id| !wanted.contains(id))
            .cloned()
            .collect();
        if added.is_empty() && removed.is_empty() {
            return Ok(false);
        }

        for room_id in &added {
            self.platform.add_room(group, room_id).await?;
        }
        for room_id in &removed {
            self.platform.remove_room(group, room_id).await?;
        }
        debug!(group = %group.key, added = added.len(), removed = removed.len(), "group rooms changed");
        group.room_ids = wanted.clone();
        Ok(true)
    }
}

pub type GroupSync = Synchronizer<GroupKind>;
