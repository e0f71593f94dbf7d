use std::path::Path;

use pb_coord::CoordConfig;
use pb_namespace::NamespaceConfig;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Complete bridge configuration, as read from a TOML file.
///
/// Every section and field is optional; missing values take their defaults.
/// Durations are in milliseconds.
///
/// ```toml
/// [namespace]
/// enabled = true
/// membership_ttl_ms = 600000
///
/// [namespace.relay]
/// whitelist = ["@*:home.org"]
///
/// [coord]
/// lock_timeout_ms = 30000
///
/// [users]
/// localpart_prefix = "_pb_"
///
/// [logging]
/// level = "debug"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub namespace: NamespaceConfig,
    pub coord: CoordConfig,
    pub users: UsersConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsersConfig {
    /// Prefix of delegate account localparts, followed by the suffix.
    pub localpart_prefix: String,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            localpart_prefix: "_pb_".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `pb_sync=debug,info`. `RUST_LOG`
    /// takes precedence when set.
    pub level: String,
    /// Include the event target in each line.
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            with_target: false,
        }
    }
}

impl BridgeConfig {
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SdkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string_pretty(self).map_err(|e| SdkError::InvalidConfig(e.to_string()))
    }

    /// Reject values the bridge cannot run with.
    pub fn validate(&self) -> SdkResult<()> {
        let mut problems: Vec<String> = self
            .coord
            .zero_fields()
            .into_iter()
            .map(|field| format!("coord.{field} must be greater than zero"))
            .collect();
        if self.namespace.membership_ttl_ms == 0 {
            problems.push("namespace.membership_ttl_ms must be greater than zero".into());
        }
        let prefix = &self.users.localpart_prefix;
        if prefix.is_empty() {
            problems.push("users.localpart_prefix must not be empty".into());
        } else if !prefix
            .bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'=' | b'-' | b'.'))
        {
            problems.push(format!("users.localpart_prefix {prefix:?} contains invalid characters"));
        }
        if self.logging.level.trim().is_empty() {
            problems.push("logging.level must not be empty".into());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(SdkError::InvalidConfig(problems.join("; ")))
        }
    }
}
