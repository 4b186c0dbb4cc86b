use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CurationError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("diff error: {0}")]
    Diff(#[from] concord_diff::DiffError),

    #[error("merge error: {0}")]
    Merge(#[from] concord_merge::MergeError),

    #[error("store error: {0}")]
    Store(#[from] concord_store::StoreError),

    #[error("{0}")]
    Types(#[from] concord_types::TypeError),
}

pub type CurationResult<T> = Result<T, CurationError>;
