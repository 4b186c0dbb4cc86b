use concord_types::Aid;

/// Errors from annotation store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The handle does not name an instance in this store.
    #[error("unknown annotation handle {0}")]
    UnknownHandle(Aid),

    /// Span offsets fall outside the document text or are inverted.
    #[error("offsets {begin}..{end} out of bounds for text of length {len}")]
    OffsetsOutOfBounds { begin: usize, end: usize, len: usize },

    /// A relation endpoint or link target points to a missing instance.
    #[error("instance {aid} references missing instance {target}")]
    DanglingReference { aid: Aid, target: Aid },

    /// An instance that must be span-anchored is not.
    #[error("instance {0} is not span-anchored")]
    NotSpanAnchored(Aid),

    /// A feature holds a value of the wrong kind for the operation.
    #[error("feature '{feature}' of instance {aid} is not link-valued")]
    FeatureTypeMismatch { aid: Aid, feature: String },

    /// The store could not be loaded by its provider.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
