use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timeouts and lifetimes of the in-process coordination primitives.
///
/// Durations are stored in milliseconds so configuration files stay flat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordConfig {
    /// How long a synchronization lock may be held before it self-releases.
    pub lock_timeout_ms: u64,
    /// Lifetime of cached entities.
    pub cache_ttl_ms: u64,
    /// How long a pending outbound send blocks inbound deduplication.
    pub dedupe_lock_timeout_ms: u64,
    /// Lifetime of remembered outbound fingerprints.
    pub dedupe_ttl_ms: u64,
}

impl Default for CoordConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 30_000,
            cache_ttl_ms: 60 * 60 * 1000,
            dedupe_lock_timeout_ms: 30_000,
            dedupe_ttl_ms: 30_000,
        }
    }
}

impl CoordConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn dedupe_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.dedupe_lock_timeout_ms)
    }

    pub fn dedupe_ttl(&self) -> Duration {
        Duration::from_millis(self.dedupe_ttl_ms)
    }

    /// Names of fields set to zero, which would disable the primitive.
    pub fn zero_fields(&self) -> Vec<&'static str> {
        [
            ("lock_timeout_ms", self.lock_timeout_ms),
            ("cache_ttl_ms", self.cache_ttl_ms),
            ("dedupe_lock_timeout_ms", self.dedupe_lock_timeout_ms),
            ("dedupe_ttl_ms", self.dedupe_ttl_ms),
        ]
        .into_iter()
        .filter(|(_, v)| *v == 0)
        .map(|(name, _)| name)
        .collect()
    }
}
