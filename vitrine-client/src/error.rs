//! Error types for the client.

use crate::config::ConfigError;
use crate::rest::ApiClientError;
use vitrine_core::{SlugParseError, StorageError};
use vitrine_storage::LmdbStoreError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiClientError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Lmdb(#[from] LmdbStoreError),
    #[error(transparent)]
    Slug(#[from] SlugParseError),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("Failed to initialize tracing: {0}")]
    Telemetry(String),
}

pub type ClientResult<T> = Result<T, ClientError>;
