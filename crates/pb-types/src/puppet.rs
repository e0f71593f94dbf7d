use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::ids::PuppetId;

/// A registered link between a home-network account and one remote account.
///
/// Puppets are provisioned elsewhere; the synchronization core only reads
/// them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuppetAccount {
    pub puppet_id: PuppetId,
    /// Home-network id of the admin who owns this puppet.
    pub owner_local_id: String,
    /// Remote-network id of the account this puppet is logged in as, once known.
    pub remote_account_id: Option<String>,
    /// Entities seen through this puppet live in the shared bucket.
    pub is_global_namespace: bool,
    /// Carries traffic for remote users without a linked puppet.
    pub is_relay: bool,
    /// Other home-network users may speak through this puppet.
    pub is_public: bool,
    #[serde(default)]
    pub data: PuppetData,
}

impl PuppetAccount {
    /// A private, isolated puppet with no relay duties.
    pub fn new(puppet_id: impl Into<PuppetId>, owner_local_id: impl Into<String>) -> Self {
        Self {
            puppet_id: puppet_id.into(),
            owner_local_id: owner_local_id.into(),
            remote_account_id: None,
            is_global_namespace: false,
            is_relay: false,
            is_public: false,
            data: PuppetData::default(),
        }
    }

    pub fn with_remote_account(mut self, remote_id: impl Into<String>) -> Self {
        self.remote_account_id = Some(remote_id.into());
        self
    }

    pub fn global(mut self) -> Self {
        self.is_global_namespace = true;
        self
    }

    pub fn relay(mut self) -> Self {
        self.is_relay = true;
        self
    }

    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }

    /// Whether `remote_id` is the account this puppet is logged in as.
    pub fn is_linked_to(&self, remote_id: &str) -> bool {
        self.remote_account_id.as_deref() == Some(remote_id)
    }
}

/// Protocol-specific puppet configuration, stored as an opaque versioned blob.
///
/// The core never looks inside `payload`; each protocol implementation owns a
/// typed schema and goes through [`PuppetData::encode`] / [`PuppetData::decode`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuppetData {
    pub version: u32,
    pub payload: serde_json::Value,
}

impl PuppetData {
    pub fn encode<T: Serialize>(version: u32, value: &T) -> Result<Self, TypeError> {
        let payload =
            serde_json::to_value(value).map_err(|e| TypeError::Serialization(e.to_string()))?;
        Ok(Self { version, payload })
    }

    /// Decode the payload, refusing blobs written under a different schema version.
    pub fn decode<T: DeserializeOwned>(&self, expected_version: u32) -> Result<T, TypeError> {
        if self.version != expected_version {
            return Err(TypeError::UnsupportedVersion {
                expected: expected_version,
                actual: self.version,
            });
        }
        serde_json::from_value(self.payload.clone())
            .map_err(|e| TypeError::Serialization(e.to_string()))
    }
}
