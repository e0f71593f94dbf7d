use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{EmoteKey, EntityKey, PuppetId, RemoteKey};
use crate::profile::Profile;

/// The four kinds of remote entity the bridge mirrors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Room,
    User,
    Group,
    Emote,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Room => "room",
            Self::User => "user",
            Self::Group => "group",
            Self::Emote => "emote",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted delegate of a remote entity.
///
/// `local_id` is the home-network identifier assigned at creation. It is
/// unique and never changes for the lifetime of the entity.
pub trait SyncedEntity: Clone + fmt::Debug + Send + Sync + 'static {
    type Key: EntityKey;

    const KIND: EntityKind;

    fn key(&self) -> &Self::Key;

    fn local_id(&self) -> &str;

    fn profile(&self) -> &Profile;

    fn profile_mut(&mut self) -> &mut Profile;
}

/// A remote room mirrored as a home-network room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomEntity {
    pub key: RemoteKey,
    pub local_id: String,
    pub profile: Profile,
    /// Puppet that created the room. Differs from `key.puppet` for shared rooms.
    pub owner_puppet: PuppetId,
    pub is_direct: bool,
    pub group_id: Option<String>,
    pub external_url: Option<String>,
}

/// A remote user mirrored as a delegate ("ghost") account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntity {
    pub key: RemoteKey,
    pub local_id: String,
    pub profile: Profile,
}

/// A remote group/community. `profile.topic` holds the short description and
/// `profile.description` the long one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntity {
    pub key: RemoteKey,
    pub local_id: String,
    pub profile: Profile,
    /// Remote ids of the rooms currently attached to the group.
    pub room_ids: Vec<String>,
}

/// A custom emote. The uploaded image lives in `profile.avatar_mxc`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmoteEntity {
    pub key: EmoteKey,
    pub local_id: String,
    pub profile: Profile,
    /// Protocol-specific emote metadata.
    pub data: serde_json::Value,
}

macro_rules! impl_synced_entity {
    ($ty:ty, $key:ty, $kind:expr) => {
        impl SyncedEntity for $ty {
            type Key = $key;

            const KIND: EntityKind = $kind;

            fn key(&self) -> &$key {
                &self.key
            }

            fn local_id(&self) -> &str {
                &self.local_id
            }

            fn profile(&self) -> &Profile {
                &self.profile
            }

            fn profile_mut(&mut self) -> &mut Profile {
                &mut self.profile
            }
        }
    };
}

impl_synced_entity!(RoomEntity, RemoteKey, EntityKind::Room);
impl_synced_entity!(UserEntity, RemoteKey, EntityKind::User);
impl_synced_entity!(GroupEntity, RemoteKey, EntityKind::Group);
impl_synced_entity!(EmoteEntity, EmoteKey, EntityKind::Emote);
