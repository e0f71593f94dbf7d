use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identifier of a registered puppet.
///
/// The value `-1` is reserved as the shared bucket used by entities living in
/// the global namespace ([`PuppetId::GLOBAL`]). Every other value names a
/// concrete puppet link.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PuppetId(i64);

impl PuppetId {
    /// The shared storage bucket for global-namespace entities.
    pub const GLOBAL: Self = Self(-1);

    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    /// Returns `true` for the shared-bucket sentinel.
    pub const fn is_global(self) -> bool {
        self.0 == -1
    }
}

impl fmt::Debug for PuppetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_global() {
            write!(f, "PuppetId(global)")
        } else {
            write!(f, "PuppetId({})", self.0)
        }
    }
}

impl fmt::Display for PuppetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for PuppetId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for PuppetId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .map(Self)
            .map_err(|_| TypeError::InvalidPuppetId(s.to_string()))
    }
}

/// Keys used to address synced entities in stores, caches and locks.
///
/// A key always carries the puppet it belongs to. Before touching the store,
/// synchronizers swap that puppet for the storage puppet returned by the
/// namespace handler, via [`EntityKey::with_puppet`].
pub trait EntityKey:
    Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    fn puppet(&self) -> PuppetId;

    /// The remote-network identifier of the entity.
    fn remote_id(&self) -> &str;

    /// The same key re-homed under another puppet.
    fn with_puppet(&self, puppet: PuppetId) -> Self;
}

/// Composite `(storage puppet, remote id)` identity of a room, user or group.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemoteKey {
    pub puppet: PuppetId,
    pub remote_id: String,
}

impl RemoteKey {
    pub fn new(puppet: impl Into<PuppetId>, remote_id: impl Into<String>) -> Self {
        Self {
            puppet: puppet.into(),
            remote_id: remote_id.into(),
        }
    }
}

impl fmt::Display for RemoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.puppet, self.remote_id)
    }
}

impl EntityKey for RemoteKey {
    fn puppet(&self) -> PuppetId {
        self.puppet
    }

    fn remote_id(&self) -> &str {
        &self.remote_id
    }

    fn with_puppet(&self, puppet: PuppetId) -> Self {
        Self {
            puppet,
            remote_id: self.remote_id.clone(),
        }
    }
}

/// Identity of a custom emote. Emotes may be scoped to a single remote room,
/// so two rooms can carry emotes with the same remote id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmoteKey {
    pub puppet: PuppetId,
    pub room_id: Option<String>,
    pub emote_id: String,
}

impl EmoteKey {
    pub fn new(
        puppet: impl Into<PuppetId>,
        room_id: Option<String>,
        emote_id: impl Into<String>,
    ) -> Self {
        Self {
            puppet: puppet.into(),
            room_id,
            emote_id: emote_id.into(),
        }
    }
}

impl fmt::Display for EmoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.room_id {
            Some(room) => write!(f, "{};{};{}", self.puppet, room, self.emote_id),
            None => write!(f, "{};;{}", self.puppet, self.emote_id),
        }
    }
}

impl EntityKey for EmoteKey {
    fn puppet(&self) -> PuppetId {
        self.puppet
    }

    fn remote_id(&self) -> &str {
        &self.emote_id
    }

    fn with_puppet(&self, puppet: PuppetId) -> Self {
        Self {
            puppet,
            room_id: self.room_id.clone(),
            emote_id: self.emote_id.clone(),
        }
    }
}
