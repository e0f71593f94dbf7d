/// Errors from store operations.
///
/// Missing entities are not errors: lookups return `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another entity already uses this home-network id.
    #[error("local id {local_id} is already used by {existing}")]
    DuplicateLocalId { local_id: String, existing: String },

    /// An upsert tried to change the immutable local id of an entity.
    #[error("local id of {key} cannot change from {old} to {new}")]
    LocalIdChanged {
        key: String,
        old: String,
        new: String,
    },

    /// Serialization or deserialization failure in a durable backend.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Failure reported by the underlying storage engine.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
