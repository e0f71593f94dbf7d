//! Entity synchronization for the puppet bridge.
//!
//! A [`Synchronizer`] maps remote entities onto persistent home-network
//! resources. Given freshly supplied remote data it resolves the stored
//! record, creating the platform resource the first time and afterwards
//! pushing only the profile fields that actually changed. Avatars are
//! content-addressed: they are re-uploaded only when their bytes change.
//!
//! One generic algorithm serves four kinds, each plugging in a platform
//! collaborator through [`SyncKind`]:
//!
//! - [`RoomSync`]: remote rooms
//! - [`UserSync`]: remote users, as delegate accounts
//! - [`GroupSync`]: groups/communities and their room lists
//! - [`EmoteSync`]: custom emotes, optionally scoped to a room

pub mod emote;
pub mod error;
pub mod group;
pub mod hooks;
pub mod media;
pub mod profile;
pub mod room;
pub mod synchronizer;
pub mod user;

#[cfg(test)]
pub(crate) mod testing;

pub use emote::{EmoteKind, EmoteListReport, EmotePlatform, EmoteSync};
pub use error::{SyncError, SyncResult};
pub use group::{GroupKind, GroupPlatform, GroupSync};
pub use hooks::{validate_override, CreateHook, FnCreateHook, OverrideOutcome};
pub use media::{AvatarChange, AvatarProcessor, MediaClient, MediaError};
pub use profile::ProfileChanges;
pub use room::{RoomKind, RoomPlatform, RoomSync};
pub use synchronizer::{KindKey, SyncKind, Synchronizer};
pub use user::{UserKind, UserPlatform, UserSync};
