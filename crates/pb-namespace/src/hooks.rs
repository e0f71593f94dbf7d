use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use pb_types::{EntityKind, PuppetId};

/// Asks a protocol implementation whether a puppet can see a remote entity.
#[async_trait]
pub trait ExistenceCheck: Send + Sync {
    async fn exists(&self, puppet: PuppetId, remote_id: &str) -> bool;
}

/// Lists the remote users present in a remote room, as seen by one puppet.
#[async_trait]
pub trait RoomRoster: Send + Sync {
    async fn users_in_room(&self, puppet: PuppetId, room_id: &str) -> Vec<String>;
}

/// Adapter turning a synchronous predicate into an [`ExistenceCheck`].
pub struct FnExistence<F>(pub F);

#[async_trait]
impl<F> ExistenceCheck for FnExistence<F>
where
    F: Fn(PuppetId, &str) -> bool + Send + Sync,
{
    async fn exists(&self, puppet: PuppetId, remote_id: &str) -> bool {
        (self.0)(puppet, remote_id)
    }
}

/// Adapter turning a synchronous function into a [`RoomRoster`].
pub struct FnRoster<F>(pub F);

#[async_trait]
impl<F> RoomRoster for FnRoster<F>
where
    F: Fn(PuppetId, &str) -> Vec<String> + Send + Sync,
{
    async fn users_in_room(&self, puppet: PuppetId, room_id: &str) -> Vec<String> {
        (self.0)(puppet, room_id)
    }
}

/// The optional hooks consulted when populating membership sets.
///
/// Every member may be absent. An absent existence check for a kind means
/// the protocol cannot tell, and every global-namespace puppet is assumed to
/// see the entity.
#[derive(Clone, Default)]
pub struct ExistenceHooks {
    pub room: Option<Arc<dyn ExistenceCheck>>,
    pub user: Option<Arc<dyn ExistenceCheck>>,
    pub group: Option<Arc<dyn ExistenceCheck>>,
    pub roster: Option<Arc<dyn RoomRoster>>,
}

impl ExistenceHooks {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_room(mut self, check: impl ExistenceCheck + 'static) -> Self {
        self.room = Some(Arc::new(check));
        self
    }

    pub fn with_user(mut self, check: impl ExistenceCheck + 'static) -> Self {
        self.user = Some(Arc::new(check));
        self
    }

    pub fn with_group(mut self, check: impl ExistenceCheck + 'static) -> Self {
        self.group = Some(Arc::new(check));
        self
    }

    pub fn with_roster(mut self, roster: impl RoomRoster + 'static) -> Self {
        self.roster = Some(Arc::new(roster));
        self
    }

    /// The existence check registered for `kind`, if any. Emotes have none.
    pub fn check_for(&self, kind: EntityKind) -> Option<&Arc<dyn ExistenceCheck>> {
        match kind {
            EntityKind::Room => self.room.as_ref(),
            EntityKind::User => self.user.as_ref(),
            EntityKind::Group => self.group.as_ref(),
            EntityKind::Emote => None,
        }
    }
}

impl fmt::Debug for ExistenceHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExistenceHooks")
            .field("room", &self.room.is_some())
            .field("user", &self.user.is_some())
            .field("group", &self.group.is_some())
            .field("roster", &self.roster.is_some())
            .finish()
    }
}
