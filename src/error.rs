//! Crate-wide error types.

use thiserror::Error;

pub type ProfResult<T> = Result<T, ProfError>;

/// Boxed error raised by an external event store.
pub type StorageSource = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ProfError {
    #[error("query build error: {0}")]
    QueryBuild(String),

    #[error("data mapping error: {0}")]
    DataMapping(String),

    #[error(transparent)]
    Storage(StorageSource),

    #[error("query cancelled: {0}")]
    Cancelled(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ProfError {
    pub fn storage(source: impl Into<StorageSource>) -> Self {
        Self::Storage(source.into())
    }
}
