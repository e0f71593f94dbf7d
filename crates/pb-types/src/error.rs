use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid puppet id: {0}")]
    InvalidPuppetId(String),

    #[error("unsupported puppet data version: expected {expected}, got {actual}")]
    UnsupportedVersion { expected: u32, actual: u32 },

    #[error("serialization error: {0}")]
    Serialization(String),
}
