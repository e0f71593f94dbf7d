//! Content hashing for the puppet bridge.
//!
//! Avatars and emotes are content-addressed: the bridge decides whether an
//! image changed by comparing BLAKE3 digests of its bytes, never by comparing
//! source URLs.

pub mod hasher;

pub use hasher::{ContentHash, ContentHasher, HasherError};
