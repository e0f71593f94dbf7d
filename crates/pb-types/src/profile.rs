use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Persisted profile of a synced entity.
///
/// `avatar_hash` always describes the bytes behind `avatar_mxc`. It may lag
/// behind `avatar_url` when the remote side moved an unchanged image.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: Option<String>,
    /// Remote-network source URL of the current avatar.
    pub avatar_url: Option<String>,
    /// Home-network URL of the uploaded avatar.
    pub avatar_mxc: Option<String>,
    /// Hex content hash of the uploaded avatar bytes.
    pub avatar_hash: Option<String>,
    pub topic: Option<String>,
    pub description: Option<String>,
}

/// Profile fields supplied by the remote side for one synchronization.
///
/// `None` means "not supplied, keep what is stored". An empty
/// `avatar_buffer` asks for the avatar to be cleared.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub avatar_buffer: Option<Bytes>,
    pub topic: Option<String>,
    pub description: Option<String>,
}

impl ProfileUpdate {
    /// Whether the update carries anything avatar related.
    pub fn has_avatar(&self) -> bool {
        self.avatar_url.is_some() || self.avatar_buffer.is_some()
    }

    /// The non-avatar fields as a fresh profile.
    pub fn to_initial_profile(&self) -> Profile {
        Profile {
            name: self.name.clone(),
            topic: self.topic.clone(),
            description: self.description.clone(),
            ..Profile::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_profile_takes_defined_fields() {
        let update = ProfileUpdate {
            name: Some("General".into()),
            topic: Some("chat".into()),
            avatar_url: Some("https://remote/a.png".into()),
            ..Default::default()
        };
        let profile = update.to_initial_profile();
        assert_eq!(profile.name.as_deref(), Some("General"));
        assert_eq!(profile.topic.as_deref(), Some("chat"));
        assert!(profile.description.is_none());
        // avatars are only recorded once uploaded
        assert!(profile.avatar_url.is_none());
        assert!(profile.avatar_mxc.is_none());
    }

    #[test]
    fn has_avatar() {
        assert!(!ProfileUpdate::default().has_avatar());
        let with_buffer = ProfileUpdate {
            avatar_buffer: Some(Bytes::new()),
            ..Default::default()
        };
        assert!(with_buffer.has_avatar());
    }
}
