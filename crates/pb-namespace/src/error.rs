use pb_store::StoreError;
use pb_types::{EntityKind, PuppetId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NamespaceError {
    /// The shared bucket was addressed while the global namespace is off.
    #[error("global namespace is not enabled")]
    GlobalNamespaceDisabled,

    #[error("invalid puppet id {0:?}")]
    InvalidPuppetId(PuppetId),

    #[error("malformed encoded id {input:?}: {reason}")]
    MalformedEncodedId { input: String, reason: String },

    #[error("malformed suffix {0:?}")]
    MalformedSuffix(String),

    /// No puppet owned by the sender and no relay puppet can see the entity.
    #[error("no relay configured for {kind} {remote_id}")]
    NoRelay { kind: EntityKind, remote_id: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type NamespaceResult<T> = Result<T, NamespaceError>;
