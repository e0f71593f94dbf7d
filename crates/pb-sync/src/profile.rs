use pb_types::{Profile, ProfileUpdate};

use crate::media::AvatarChange;

/// The profile fields a synchronization changes.
///
/// Each `Some` is a field to push to the platform and persist. A field is
/// only ever changed when the remote side supplied a value that differs from
/// the stored one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub topic: Option<String>,
    pub description: Option<String>,
    pub avatar: Option<AvatarChange>,
}

impl ProfileChanges {
    /// Diff the text fields of `update` against `stored`. Avatars go through
    /// [`AvatarProcessor`](crate::media::AvatarProcessor).
    pub fn between(stored: &Profile, update: &ProfileUpdate) -> Self {
        Self {
            name: changed(&stored.name, &update.name),
            topic: changed(&stored.topic, &update.topic),
            description: changed(&stored.description, &update.description),
            avatar: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.topic.is_none()
            && self.description.is_none()
            && self.avatar.is_none()
    }

    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(name) = &self.name {
            profile.name = Some(name.clone());
        }
        if let Some(topic) = &self.topic {
            profile.topic = Some(topic.clone());
        }
        if let Some(description) = &self.description {
            profile.description = Some(description.clone());
        }
        if let Some(avatar) = &self.avatar {
            avatar.apply_to(profile);
        }
    }

    /// Names of the changed fields, for logging.
    pub fn fields(&self) -> Vec<&'static str> {
        [
            ("name", self.name.is_some()),
            ("topic", self.topic.is_some()),
            ("description", self.description.is_some()),
            ("avatar", self.avatar.is_some()),
        ]
        .into_iter()
        .filter_map(|(field, set)| set.then_some(field))
        .collect()
    }
}

fn changed(stored: &Option<String>, supplied: &Option<String>) -> Option<String> {
    match supplied {
        Some(value) if stored.as_ref() != Some(value) => Some(value.clone()),
        _ => None,
    }
}
