use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bridge is missing a {0}")]
    MissingComponent(&'static str),

    #[error("logging setup failed: {0}")]
    Logging(String),

    #[error("namespace error: {0}")]
    Namespace(#[from] pb_namespace::NamespaceError),

    #[error("sync error: {0}")]
    Sync(#[from] pb_sync::SyncError),
}

pub type SdkResult<T> = Result<T, SdkError>;
