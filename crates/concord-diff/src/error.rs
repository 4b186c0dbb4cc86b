//! Error types for the diff crate.

use concord_types::{Aid, AnnotatorId};

/// Errors that can occur during diff operations.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// A diff target names a type that has no registered adapter.
    #[error("no diff adapter registered for type '{0}'")]
    UnknownType(String),

    /// An adapter for this type is already registered.
    #[error("diff adapter for type '{0}' registered twice")]
    DuplicateType(String),

    /// The same type appears twice in one list of diff targets.
    #[error("type '{0}' listed twice in diff targets")]
    DuplicateTarget(String),

    /// A link sub-position was requested without the key its comparison
    /// mode needs (or for a feature that is not a per-entry link feature).
    #[error("invalid link comparison request on '{type_name}.{feature}': {reason}")]
    InvalidLinkRequest {
        type_name: String,
        feature: String,
        reason: String,
    },

    /// An instance is anchored differently from what its type's adapter
    /// expects (e.g. a relation-anchored instance of a span type).
    #[error("instance {aid} of type '{type_name}' is not {expected}-anchored")]
    AnchorMismatch {
        aid: Aid,
        type_name: String,
        expected: &'static str,
    },

    /// An annotator was added twice to a configuration that does not allow
    /// stacking.
    #[error("annotator {annotator} already present at {position}")]
    DuplicateAnnotator {
        annotator: AnnotatorId,
        position: String,
    },

    /// A configuration was added to a set for a different position.
    #[error("configuration at {found} does not belong to set at {expected}")]
    PositionMismatch { expected: String, found: String },

    /// Reading an annotator's store failed.
    #[error("store error: {0}")]
    Store(#[from] concord_store::StoreError),
}

impl DiffError {
    /// Returns `true` if the error is caused by one annotator's data rather
    /// than by the caller's configuration. Such errors exclude only that
    /// annotator from the unit of work.
    pub fn is_annotator_fault(&self) -> bool {
        matches!(
            self,
            Self::Store(_) | Self::AnchorMismatch { .. } | Self::DuplicateAnnotator { .. }
        )
    }
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
