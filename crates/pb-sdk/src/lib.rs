//! High-level SDK for the puppet bridge core.
//!
//! Loads the bridge configuration, installs logging and assembles the
//! namespace handler and the four synchronizers into one [`Bridge`].
//! This is the main entry point for protocol implementations.

pub mod bridge;
pub mod config;
pub mod error;
pub mod logging;

pub use bridge::{Bridge, BridgeBuilder};
pub use config::{BridgeConfig, LoggingConfig, UsersConfig};
pub use error::{SdkError, SdkResult};

// Re-export key types
pub use pb_coord::{CoordConfig, MessageDeduplicator};
pub use pb_namespace::{ExistenceHooks, NamespaceConfig, NamespaceHandler, RelayPolicy};
pub use pb_sync::{
    EmotePlatform, GroupPlatform, MediaClient, ProfileChanges, RoomPlatform, SyncError,
    UserPlatform,
};
pub use pb_types::{
    EmoteEntity, GroupEntity, PuppetAccount, PuppetId, RemoteEmote, RemoteGroup, RemoteKey,
    RemoteRoom, RemoteUser, RoomEntity, UserEntity,
};
