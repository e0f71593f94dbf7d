use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use pb_crypto::ContentHasher;
use pb_types::{EmoteEntity, EmoteKey, Profile, PuppetId, RemoteEmote};
use tracing::{debug, warn};

use crate::error::SyncResult;
use crate::profile::ProfileChanges;
use crate::room::set_if_changed;
use crate::synchronizer::{SyncKind, Synchronizer};

/// Home-network side effects for custom emotes.
#[async_trait]
pub trait EmotePlatform: Send + Sync {
    /// Register the emote, returning the id it is known by on the home network.
    async fn create_emote(&self, key: &EmoteKey, emote: &RemoteEmote, profile: &Profile) -> SyncResult<String>;

    async fn update_emote(&self, emote: &EmoteEntity, changes: &ProfileChanges) -> SyncResult<()>;
}

pub struct EmoteKind {
    platform: Arc<dyn EmotePlatform>,
}

impl EmoteKind {
    pub fn new(platform: Arc<dyn EmotePlatform>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl SyncKind for EmoteKind {
    type Entity = EmoteEntity;
    type Data = RemoteEmote;

    const HASHER: ContentHasher = ContentHasher::EMOTE;

    async fn create(&self, key: &EmoteKey, data: &RemoteEmote, profile: &Profile) -> SyncResult<String> {
        self.platform.create_emote(key, data, profile).await
    }

    fn build(&self, key: EmoteKey, local_id: String, profile: Profile, data: &RemoteEmote) -> EmoteEntity {
        EmoteEntity {
            key,
            local_id,
            profile,
            data: data.data.clone().unwrap_or_default(),
        }
    }

    async fn update(&self, emote: &EmoteEntity, changes: &ProfileChanges) -> SyncResult<()> {
        self.platform.update_emote(emote, changes).await
    }

    async fn merge_extra(&self, emote: &mut EmoteEntity, data: &RemoteEmote) -> SyncResult<bool> {
        Ok(match &data.data {
            Some(value) => set_if_changed(&mut emote.data, value.clone()),
            None => false,
        })
    }
}

pub type EmoteSync = Synchronizer<EmoteKind>;

/// Result of [`EmoteSync::set_from_list`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmoteListReport {
    pub created: usize,
    pub existing: usize,
    pub removed: usize,
}

impl Synchronizer<EmoteKind> {
    /// Find the emote of `puppet` whose uploaded image is `mxc`.
    pub async fn get_by_mxc(&self, puppet: PuppetId, mxc: &str) -> Option<EmoteEntity> {
        match self.list_by_puppet(puppet).await {
            Ok(emotes) => emotes
                .into_iter()
                .find(|e| e.profile.avatar_mxc.as_deref() == Some(mxc)),
            Err(err) => {
                warn!(%puppet, error = %err, "emote lookup failed");
                None
            }
        }
    }

    /// Make the emotes of `puppet` in scope `room_id` exactly `emotes`:
    /// synchronize each listed emote and delete stored ones missing from the
    /// list. Listed emotes are re-scoped to `(puppet, room_id)`.
    pub async fn set_from_list(
        &self,
        puppet: PuppetId,
        room_id: Option<&str>,
        emotes: Vec<RemoteEmote>,
    ) -> SyncResult<EmoteListReport> {
        let mut report = EmoteListReport::default();
        let mut listed = HashSet::new();
        for mut emote in emotes {
            emote.puppet_id = puppet;
            emote.room_id = room_id.map(str::to_string);
            listed.insert(emote.emote_id.clone());
            let (_, created) = self.resolve_or_create(emote).await?;
            if created {
                report.created += 1;
            } else {
                report.existing += 1;
            }
        }

        for stored in self.list_by_puppet(puppet).await? {
            let in_scope = stored.key.room_id.as_deref() == room_id;
            if !in_scope || listed.contains(&stored.key.emote_id) {
                continue;
            }
            if self.delete(&stored.key).await? {
                report.removed += 1;
            }
        }
        debug!(%puppet, room = ?room_id, ?report, "emote list synchronized");
        Ok(report)
    }
}
