use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use pb_coord::TtlCache;
use pb_store::PuppetStore;
use pb_types::{EntityKind, PuppetAccount, PuppetId, RemoteRoom, RemoteUser};
use tracing::{debug, trace};

use crate::codec;
use crate::config::NamespaceConfig;
use crate::error::{NamespaceError, NamespaceResult};
use crate::hooks::ExistenceHooks;

type MembershipKey = (EntityKind, String);

/// Resolves which puppet owns a remote entity and who may see it.
///
/// With the global namespace disabled every puppet is isolated and most
/// questions answer themselves. With it enabled, entities seen through
/// global-namespace puppets live in the shared bucket ([`PuppetId::GLOBAL`])
/// and the handler tracks, per remote id, the set of puppets that can see
/// the entity ("membership"). Membership sets are computed lazily through the
/// [`ExistenceHooks`], cached for `membership_ttl`, and always recomputed
/// from scratch.
pub struct NamespaceHandler {
    config: NamespaceConfig,
    puppets: Arc<dyn PuppetStore>,
    hooks: ExistenceHooks,
    membership: TtlCache<MembershipKey, Arc<BTreeSet<PuppetId>>>,
}

impl NamespaceHandler {
    pub fn new(config: NamespaceConfig, puppets: Arc<dyn PuppetStore>, hooks: ExistenceHooks) -> Self {
        let membership = TtlCache::new(config.membership_ttl());
        Self {
            config,
            puppets,
            hooks,
            membership,
        }
    }

    pub fn config(&self) -> &NamespaceConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    // -----------------------------------------------------------------------
    // Identifier codec
    // -----------------------------------------------------------------------

    pub fn make_suffix(&self, puppet: PuppetId, remote_id: &str) -> NamespaceResult<String> {
        codec::make_suffix(puppet, remote_id, self.config.enabled)
    }

    pub fn decode_suffix(&self, suffix: &str) -> NamespaceResult<(PuppetId, String)> {
        codec::decode_suffix(suffix, self.config.enabled)
    }

    // -----------------------------------------------------------------------
    // Ownership
    // -----------------------------------------------------------------------

    /// The puppet id entities of `puppet` are stored under: the shared bucket
    /// for global-namespace puppets, `puppet` itself otherwise.
    pub async fn storage_puppet_id(&self, puppet: PuppetId) -> NamespaceResult<PuppetId> {
        if puppet.is_global() {
            return if self.config.enabled {
                Ok(PuppetId::GLOBAL)
            } else {
                Err(NamespaceError::GlobalNamespaceDisabled)
            };
        }
        if !self.config.enabled {
            return Ok(puppet);
        }
        match self.puppets.get(puppet).await? {
            Some(account) if account.is_global_namespace => Ok(PuppetId::GLOBAL),
            _ => Ok(puppet),
        }
    }

    /// Pick the puppet that should act for `sender` on a remote entity.
    ///
    /// Outside the global namespace this is `puppet` itself. Inside it, the
    /// puppet owned by `sender` among those that can see the entity wins,
    /// then a relay puppet among them. With neither, the request fails.
    pub async fn resolve_owner(
        &self,
        kind: EntityKind,
        puppet: PuppetId,
        remote_id: &str,
        sender: &str,
    ) -> NamespaceResult<PuppetId> {
        if !self.config.enabled {
            return Ok(puppet);
        }
        if !puppet.is_global() {
            match self.puppets.get(puppet).await? {
                Some(account) if account.is_global_namespace => {}
                _ => return Ok(puppet),
            }
        }
        let accounts = self.global_accounts().await?;
        let members = self.membership_among(kind, remote_id, &accounts).await;
        let candidates: Vec<&PuppetAccount> =
            members.iter().filter_map(|id| accounts.get(id)).collect();

        if let Some(owned) = candidates.iter().find(|p| p.owner_local_id == sender) {
            debug!(%kind, remote_id, puppet = %owned.puppet_id, "resolved owner by sender");
            return Ok(owned.puppet_id);
        }
        if let Some(relay) = candidates.iter().find(|p| p.is_relay) {
            debug!(%kind, remote_id, puppet = %relay.puppet_id, "resolved owner by relay");
            return Ok(relay.puppet_id);
        }
        Err(NamespaceError::NoRelay {
            kind,
            remote_id: remote_id.to_string(),
        })
    }

    // -----------------------------------------------------------------------
    // Visibility
    // -----------------------------------------------------------------------

    /// Whether a message from `user` arriving through `room.puppet_id` must be
    /// dropped because another puppet sharing the room delivers it.
    ///
    /// The puppet linked to the sender delivers its own messages. Messages of
    /// everyone else are delivered by the relay puppet. When neither is
    /// present, the only connection that saw the message delivers it.
    ///
    /// A message always arrives through a concrete puppet, so `room` must not
    /// be keyed by the shared bucket.
    pub async fn is_message_blocked(
        &self,
        room: &RemoteRoom,
        user: &RemoteUser,
    ) -> NamespaceResult<bool> {
        if room.puppet_id.is_global() {
            return Err(NamespaceError::InvalidPuppetId(room.puppet_id));
        }
        if !self.config.enabled {
            return Ok(false);
        }
        let accounts = self.global_accounts().await?;
        if !accounts.contains_key(&room.puppet_id) {
            // isolated puppet, nothing is shared
            return Ok(false);
        }
        let present = self.puppets_in_room(&room.room_id, &accounts).await;

        if let Some(linked) = present.iter().find(|p| p.is_linked_to(&user.user_id)) {
            let blocked = linked.puppet_id != room.puppet_id;
            trace!(room = %room.room_id, user = %user.user_id, blocked, "sender has a linked puppet");
            return Ok(blocked);
        }
        if let Some(relay) = present.iter().find(|p| p.is_relay) {
            let blocked = relay.puppet_id != room.puppet_id;
            trace!(room = %room.room_id, user = %user.user_id, blocked, "relay delivers");
            return Ok(blocked);
        }
        Ok(false)
    }

    /// Whether the home-network user `sender` may see and use `room`.
    pub async fn can_see(&self, room: &RemoteRoom, sender: &str) -> NamespaceResult<bool> {
        if !room.puppet_id.is_global() {
            return Ok(self
                .puppets
                .get(room.puppet_id)
                .await?
                .is_some_and(|p| self.admits(&p, sender)));
        }
        if !self.config.enabled {
            return Err(NamespaceError::GlobalNamespaceDisabled);
        }
        let accounts = self.global_accounts().await?;
        let members = self
            .membership_among(EntityKind::Room, &room.room_id, &accounts)
            .await;
        Ok(members
            .iter()
            .filter_map(|id| accounts.get(id))
            .any(|p| self.admits(p, sender)))
    }

    /// Whether `sender` administers `room`: it must own the only puppet that
    /// can see the room.
    pub async fn is_admin(&self, room: &RemoteRoom, sender: &str) -> NamespaceResult<bool> {
        if !room.puppet_id.is_global() {
            return Ok(self
                .puppets
                .get(room.puppet_id)
                .await?
                .is_some_and(|p| p.owner_local_id == sender));
        }
        if !self.config.enabled {
            return Err(NamespaceError::GlobalNamespaceDisabled);
        }
        let members = self.membership(EntityKind::Room, &room.room_id).await?;
        if members.len() != 1 {
            return Ok(false);
        }
        let Some(&only) = members.iter().next() else {
            return Ok(false);
        };
        Ok(self
            .puppets
            .get(only)
            .await?
            .is_some_and(|p| p.owner_local_id == sender))
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// The global-namespace puppets that can see `remote_id`. Reuses a cached
    /// set when one is live, otherwise asks the existence hook once per
    /// global-namespace puppet.
    pub async fn membership(
        &self,
        kind: EntityKind,
        remote_id: &str,
    ) -> NamespaceResult<Arc<BTreeSet<PuppetId>>> {
        if let Some(cached) = self.membership.get(&(kind, remote_id.to_string())) {
            return Ok(cached);
        }
        let accounts = self.global_accounts().await?;
        Ok(self.membership_among(kind, remote_id, &accounts).await)
    }

    /// Membership computed against an already loaded set of global puppets.
    async fn membership_among(
        &self,
        kind: EntityKind,
        remote_id: &str,
        accounts: &BTreeMap<PuppetId, PuppetAccount>,
    ) -> Arc<BTreeSet<PuppetId>> {
        let key = (kind, remote_id.to_string());
        if let Some(cached) = self.membership.get(&key) {
            return cached;
        }
        let check = self.hooks.check_for(kind);
        let mut members = BTreeSet::new();
        for puppet in accounts.values() {
            let visible = match check {
                Some(check) => check.exists(puppet.puppet_id, remote_id).await,
                None => true,
            };
            if visible {
                members.insert(puppet.puppet_id);
            }
        }
        debug!(%kind, remote_id, count = members.len(), "membership populated");
        let members = Arc::new(members);
        self.membership.set(key, Arc::clone(&members));
        members
    }

    /// Forget the membership of one entity.
    pub fn invalidate(&self, kind: EntityKind, remote_id: &str) {
        self.membership.remove(&(kind, remote_id.to_string()));
    }

    /// Forget every membership set mentioning `puppet`, e.g. after it was deleted.
    pub fn invalidate_puppet(&self, puppet: PuppetId) -> usize {
        self.membership.remove_where(|_, members| members.contains(&puppet))
    }

    /// Forget all membership sets, e.g. after a puppet was added.
    pub fn clear(&self) {
        self.membership.clear();
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn global_accounts(&self) -> NamespaceResult<BTreeMap<PuppetId, PuppetAccount>> {
        Ok(self
            .puppets
            .list_global()
            .await?
            .into_iter()
            .map(|p| (p.puppet_id, p))
            .collect())
    }

    /// Global puppets that see the room, plus those whose remote account the
    /// roster reports as present in it.
    async fn puppets_in_room<'a>(
        &self,
        room_id: &str,
        accounts: &'a BTreeMap<PuppetId, PuppetAccount>,
    ) -> Vec<&'a PuppetAccount> {
        let members = self
            .membership_among(EntityKind::Room, room_id, accounts)
            .await;
        let mut present_users = BTreeSet::new();
        if let Some(roster) = &self.hooks.roster {
            for puppet in members.iter() {
                present_users.extend(roster.users_in_room(*puppet, room_id).await);
            }
        }
        accounts
            .values()
            .filter(|p| {
                members.contains(&p.puppet_id)
                    || p
                        .remote_account_id
                        .as_ref()
                        .is_some_and(|id| present_users.contains(id))
            })
            .collect()
    }

    fn admits(&self, puppet: &PuppetAccount, sender: &str) -> bool {
        puppet.owner_local_id == sender || (puppet.is_public && self.config.relay.allows(sender))
    }
}

impl std::fmt::Debug for NamespaceHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceHandler")
            .field("config", &self.config)
            .field("hooks", &self.hooks)
            .field("cached_memberships", &self.membership.len())
            .finish()
    }
}
