//! Foundation types for the puppet bridge.
//!
//! Every other `pb-*` crate depends on `pb-types`. It defines how a remote
//! entity is addressed and what the bridge remembers about it.
//!
//! # Key Types
//!
//! - [`PuppetId`]: puppet identifier, with `-1` as the shared-bucket sentinel
//! - [`RemoteKey`] / [`EmoteKey`]: composite identities used by stores, caches and locks
//! - [`PuppetAccount`]: a registered puppet link, read-only for the core
//! - [`Profile`] / [`ProfileUpdate`]: stored and supplied profile data
//! - [`RoomEntity`], [`UserEntity`], [`GroupEntity`], [`EmoteEntity`]: persisted delegates
//! - [`RemoteRoom`], [`RemoteUser`], [`RemoteGroup`], [`RemoteEmote`]: supplied remote data

pub mod entity;
pub mod error;
pub mod ids;
pub mod profile;
pub mod puppet;
pub mod remote;

pub use entity::{EmoteEntity, EntityKind, GroupEntity, RoomEntity, SyncedEntity, UserEntity};
pub use error::TypeError;
pub use ids::{EmoteKey, EntityKey, PuppetId, RemoteKey};
pub use profile::{Profile, ProfileUpdate};
pub use puppet::{PuppetAccount, PuppetData};
pub use remote::{RemoteData, RemoteEmote, RemoteGroup, RemoteRoom, RemoteUser};
