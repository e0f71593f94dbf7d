use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use pb_crypto::{ContentHash, ContentHasher};
use pb_types::{Profile, ProfileUpdate};
use thiserror::Error;
use tracing::{debug, warn};

/// Failures of the media collaborator. Never propagated out of a
/// synchronization: the avatar is left untouched and the next sync retries.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("fetching {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    #[error("upload failed: {0}")]
    Upload(String),
}

/// Downloads remote media and uploads it to the home network.
#[async_trait]
pub trait MediaClient: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, MediaError>;

    /// Upload `data`, returning the home-network URL of the stored content.
    async fn upload(
        &self,
        data: Bytes,
        mime_type: Option<&str>,
        filename: Option<&str>,
    ) -> Result<String, MediaError>;
}

/// Outcome of avatar processing for one synchronization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AvatarChange {
    Cleared,
    Replaced {
        /// Remote source URL the bytes came from, if any.
        url: Option<String>,
        mxc: String,
        hash: String,
    },
}

impl AvatarChange {
    pub fn apply_to(&self, profile: &mut Profile) {
        match self {
            AvatarChange::Cleared => {
                profile.avatar_url = None;
                profile.avatar_mxc = None;
                profile.avatar_hash = None;
            }
            AvatarChange::Replaced { url, mxc, hash } => {
                profile.avatar_url = url.clone();
                profile.avatar_mxc = Some(mxc.clone());
                profile.avatar_hash = Some(hash.clone());
            }
        }
    }
}

/// Content-addressed avatar handling.
///
/// The content hash, not the source URL, decides whether an avatar changed:
/// the same bytes behind a new URL cause neither an upload nor a profile
/// mutation.
#[derive(Clone)]
pub struct AvatarProcessor {
    media: Arc<dyn MediaClient>,
    hasher: ContentHasher,
}

impl AvatarProcessor {
    pub fn new(media: Arc<dyn MediaClient>, hasher: ContentHasher) -> Self {
        Self { media, hasher }
    }

    /// Compare the supplied avatar against the stored one. Returns `None` when
    /// nothing changed or when fetching/uploading failed.
    pub async fn process(&self, stored: &Profile, update: &ProfileUpdate) -> Option<AvatarChange> {
        let has_avatar = stored.avatar_mxc.is_some() || stored.avatar_hash.is_some();

        let bytes = match (&update.avatar_buffer, &update.avatar_url) {
            (Some(buffer), _) => buffer.clone(),
            (None, Some(url)) if url.is_empty() => Bytes::new(),
            (None, Some(url)) if stored.avatar_url.as_deref() != Some(url.as_str()) => {
                match self.media.fetch(url).await {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        warn!(url = %url, error = %err, "avatar fetch failed");
                        return None;
                    }
                }
            }
            _ => return None,
        };

        if bytes.is_empty() {
            return has_avatar.then_some(AvatarChange::Cleared);
        }

        let hash = self.hasher.hash(&bytes);
        if stored_hash(stored) == Some(hash) {
            debug!(%hash, "avatar content unchanged");
            return None;
        }

        match self.media.upload(bytes, None, None).await {
            Ok(mxc) => {
                debug!(%hash, mxc = %mxc, "avatar uploaded");
                Some(AvatarChange::Replaced {
                    url: update.avatar_url.clone(),
                    mxc,
                    hash: hash.to_hex(),
                })
            }
            Err(err) => {
                warn!(error = %err, "avatar upload failed");
                None
            }
        }
    }
}

/// The digest of the stored avatar. An unreadable digest counts as no digest,
/// so the next sync uploads again and rewrites it.
fn stored_hash(stored: &Profile) -> Option<ContentHash> {
    let hex = stored.avatar_hash.as_deref()?;
    match ContentHash::from_hex(hex) {
        Ok(hash) => Some(hash),
        Err(err) => {
            warn!(stored = hex, error = %err, "ignoring unreadable avatar hash");
            None
        }
    }
}

impl std::fmt::Debug for AvatarProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarProcessor")
            .field("hasher", &self.hasher)
            .finish()
    }
}
