use std::fmt;

use serde::{Deserialize, Serialize};

/// A 32-byte BLAKE3 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Full hex encoding, the form stored in profiles.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a digest stored by [`to_hex`](Self::to_hex).
    pub fn from_hex(s: &str) -> Result<Self, HasherError> {
        let bytes = hex::decode(s).map_err(|e| HasherError::InvalidHex(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| HasherError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Domain-separated BLAKE3 content hasher.
///
/// The domain tag is prepended to every computation so that an avatar and an
/// emote with identical bytes still hash differently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for room, user and group avatars.
    pub const AVATAR: Self = Self {
        domain: "pb-avatar-v1",
    };
    /// Hasher for custom emote images.
    pub const EMOTE: Self = Self {
        domain: "pb-emote-v1",
    };

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ContentHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ContentHash(*hasher.finalize().as_bytes())
    }
}

/// Errors from parsing a stored digest.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("invalid hex digest: {0}")]
    InvalidHex(String),

    #[error("invalid digest length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}
