use pb_namespace::NamespaceError;
use pb_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A platform collaborator failed to create or update a resource.
    #[error("platform error: {0}")]
    Platform(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("namespace error: {0}")]
    Namespace(#[from] NamespaceError),
}

impl SyncError {
    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform(msg.into())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
