use std::sync::Arc;

use async_trait::async_trait;
use pb_namespace::codec;
use pb_types::{EntityKey, Profile, RemoteKey, RemoteUser, UserEntity};

use crate::error::SyncResult;
use crate::profile::ProfileChanges;
use crate::synchronizer::{SyncKind, Synchronizer};

/// Home-network side effects for delegate accounts.
#[async_trait]
pub trait UserPlatform: Send + Sync {
    /// Register the delegate account `localpart`, returning its full id.
    async fn register_user(&self, localpart: &str, user: &RemoteUser, profile: &Profile) -> SyncResult<String>;

    async fn update_user(&self, user: &UserEntity, changes: &ProfileChanges) -> SyncResult<()>;
}

pub struct UserKind {
    platform: Arc<dyn UserPlatform>,
    localpart_prefix: String,
}

impl UserKind {
    pub fn new(platform: Arc<dyn UserPlatform>, localpart_prefix: impl Into<String>) -> Self {
        Self {
            platform,
            localpart_prefix: localpart_prefix.into(),
        }
    }

    pub fn localpart_prefix(&self) -> &str {
        &self.localpart_prefix
    }

    /// Delegate localpart for a storage key: the prefix followed by the suffix.
    pub fn localpart(&self, key: &RemoteKey) -> SyncResult<String> {
        // a storage key only carries the shared bucket when the global namespace is on
        let suffix = codec::make_suffix(key.puppet(), key.remote_id(), key.puppet().is_global())?;
        Ok(format!("{}{}", self.localpart_prefix, suffix))
    }
}

#[async_trait]
impl SyncKind for UserKind {
    type Entity = UserEntity;
    type Data = RemoteUser;

    async fn create(&self, key: &RemoteKey, data: &RemoteUser, profile: &Profile) -> SyncResult<String> {
        let localpart = self.localpart(key)?;
        self.platform.register_user(&localpart, data, profile).await
    }

    fn build(&self, key: RemoteKey, local_id: String, profile: Profile, _data: &RemoteUser) -> UserEntity {
        UserEntity {
            key,
            local_id,
            profile,
        }
    }

    async fn update(&self, user: &UserEntity, changes: &ProfileChanges) -> SyncResult<()> {
        self.platform.update_user(user, changes).await
    }
}

pub type UserSync = Synchronizer<UserKind>;

impl Synchronizer<UserKind> {
    /// Decode a delegate localpart back into its storage key. Localparts
    /// without the configured prefix are not ours and yield `None`.
    pub fn parts_from_localpart(&self, localpart: &str) -> SyncResult<Option<RemoteKey>> {
        let Some(suffix) = localpart.strip_prefix(self.kind().localpart_prefix()) else {
            return Ok(None);
        };
        let (puppet, remote_id) = self.namespace().decode_suffix(suffix)?;
        Ok(Some(RemoteKey::new(puppet, remote_id)))
    }
}
