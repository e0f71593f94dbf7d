//! Namespace resolution for the puppet bridge.
//!
//! Two concerns live here:
//!
//! - [`codec`] -- reversible encoding of remote ids into home-network-safe
//!   identifiers, and the `"{puppet}_{id}"` / `"_{id}"` suffix format
//! - [`NamespaceHandler`] -- which puppet owns a remote entity, who can see
//!   it and which connection delivers a message when several puppets share a
//!   room through the global namespace

pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod hooks;

pub use codec::{decode_id, decode_suffix, encode_id, make_suffix};
pub use config::{NamespaceConfig, RelayPolicy};
pub use error::{NamespaceError, NamespaceResult};
pub use handler::NamespaceHandler;
pub use hooks::{ExistenceCheck, ExistenceHooks, FnExistence, FnRoster, RoomRoster};
