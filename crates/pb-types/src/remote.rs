use std::fmt;

use bytes::Bytes;

use crate::ids::{EmoteKey, EntityKey, PuppetId, RemoteKey};
use crate::profile::ProfileUpdate;

/// Data describing a remote entity as seen by one puppet.
///
/// The key returned by [`RemoteData::request_key`] carries the puppet the data
/// arrived through, not the storage puppet.
pub trait RemoteData: Clone + fmt::Debug + Send + Sync + 'static {
    type Key: EntityKey;

    fn request_key(&self) -> Self::Key;

    fn profile_update(&self) -> ProfileUpdate;
}

/// A remote room as reported by a protocol implementation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteRoom {
    pub puppet_id: PuppetId,
    pub room_id: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub avatar_buffer: Option<Bytes>,
    pub topic: Option<String>,
    pub is_direct: Option<bool>,
    pub group_id: Option<String>,
    pub external_url: Option<String>,
}

impl RemoteRoom {
    pub fn new(puppet_id: impl Into<PuppetId>, room_id: impl Into<String>) -> Self {
        Self {
            puppet_id: puppet_id.into(),
            room_id: room_id.into(),
            name: None,
            avatar_url: None,
            avatar_buffer: None,
            topic: None,
            is_direct: None,
            group_id: None,
            external_url: None,
        }
    }
}

impl RemoteData for RemoteRoom {
    type Key = RemoteKey;

    fn request_key(&self) -> RemoteKey {
        RemoteKey::new(self.puppet_id, self.room_id.clone())
    }

    fn profile_update(&self) -> ProfileUpdate {
        ProfileUpdate {
            name: self.name.clone(),
            avatar_url: self.avatar_url.clone(),
            avatar_buffer: self.avatar_buffer.clone(),
            topic: self.topic.clone(),
            description: None,
        }
    }
}

/// A remote user as reported by a protocol implementation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteUser {
    pub puppet_id: PuppetId,
    pub user_id: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub avatar_buffer: Option<Bytes>,
}

impl RemoteUser {
    pub fn new(puppet_id: impl Into<PuppetId>, user_id: impl Into<String>) -> Self {
        Self {
            puppet_id: puppet_id.into(),
            user_id: user_id.into(),
            name: None,
            avatar_url: None,
            avatar_buffer: None,
        }
    }
}

impl RemoteData for RemoteUser {
    type Key = RemoteKey;

    fn request_key(&self) -> RemoteKey {
        RemoteKey::new(self.puppet_id, self.user_id.clone())
    }

    fn profile_update(&self) -> ProfileUpdate {
        ProfileUpdate {
            name: self.name.clone(),
            avatar_url: self.avatar_url.clone(),
            avatar_buffer: self.avatar_buffer.clone(),
            topic: None,
            description: None,
        }
    }
}

/// A remote group/community as reported by a protocol implementation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteGroup {
    pub puppet_id: PuppetId,
    pub group_id: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub avatar_buffer: Option<Bytes>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    /// Full list of member rooms, when known.
    pub room_ids: Option<Vec<String>>,
}

impl RemoteGroup {
    pub fn new(puppet_id: impl Into<PuppetId>, group_id: impl Into<String>) -> Self {
        Self {
            puppet_id: puppet_id.into(),
            group_id: group_id.into(),
            name: None,
            avatar_url: None,
            avatar_buffer: None,
            short_description: None,
            long_description: None,
            room_ids: None,
        }
    }
}

impl RemoteData for RemoteGroup {
    type Key = RemoteKey;

    fn request_key(&self) -> RemoteKey {
        RemoteKey::new(self.puppet_id, self.group_id.clone())
    }

    fn profile_update(&self) -> ProfileUpdate {
        ProfileUpdate {
            name: self.name.clone(),
            avatar_url: self.avatar_url.clone(),
            avatar_buffer: self.avatar_buffer.clone(),
            topic: self.short_description.clone(),
            description: self.long_description.clone(),
        }
    }
}

/// A custom emote as reported by a protocol implementation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteEmote {
    pub puppet_id: PuppetId,
    pub room_id: Option<String>,
    pub emote_id: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub avatar_buffer: Option<Bytes>,
    pub data: Option<serde_json::Value>,
}

impl RemoteEmote {
    pub fn new(
        puppet_id: impl Into<PuppetId>,
        room_id: Option<String>,
        emote_id: impl Into<String>,
    ) -> Self {
        Self {
            puppet_id: puppet_id.into(),
            room_id,
            emote_id: emote_id.into(),
            name: None,
            avatar_url: None,
            avatar_buffer: None,
            data: None,
        }
    }
}

impl RemoteData for RemoteEmote {
    type Key = EmoteKey;

    fn request_key(&self) -> EmoteKey {
        EmoteKey::new(self.puppet_id, self.room_id.clone(), self.emote_id.clone())
    }

    fn profile_update(&self) -> ProfileUpdate {
        ProfileUpdate {
            name: self.name.clone(),
            avatar_url: self.avatar_url.clone(),
            avatar_buffer: self.avatar_buffer.clone(),
            topic: None,
            description: None,
        }
    }
}
