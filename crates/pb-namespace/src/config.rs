use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Namespace configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    /// Allow puppets to share remote entities through the global namespace.
    pub enabled: bool,
    /// How long a computed membership set is reused before it is recomputed.
    pub membership_ttl_ms: u64,
    pub relay: RelayPolicy,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            membership_ttl_ms: 60 * 60 * 1000,
            relay: RelayPolicy::default(),
        }
    }
}

impl NamespaceConfig {
    /// Global namespace turned on, everything else default.
    pub fn global() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }

    pub fn membership_ttl(&self) -> Duration {
        Duration::from_millis(self.membership_ttl_ms)
    }
}

/// Which home-network users may speak through someone else's public puppet.
///
/// Patterns match whole ids; `*` matches any run of characters. The blacklist
/// wins over the whitelist, and an empty whitelist admits everyone.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayPolicy {
    pub whitelist: Vec<String>,
    pub blacklist: Vec<String>,
}

impl RelayPolicy {
    pub fn allows(&self, sender: &str) -> bool {
        if self.blacklist.iter().any(|p| wildcard_match(p, sender)) {
            return false;
        }
        self.whitelist.is_empty() || self.whitelist.iter().any(|p| wildcard_match(p, sender))
    }
}

fn wildcard_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return text.is_empty();
    };
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };
    let tail: Vec<&str> = parts.collect();
    let Some((last, middle)) = tail.split_last() else {
        // no '*' at all
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}
