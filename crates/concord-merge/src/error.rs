/// Errors that can occur while building merge strategies.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MergeError {
    /// The confidence threshold is not a number in `[0, 1]`.
    #[error("minimum confidence must lie in [0, 1], got {0}")]
    InvalidConfidence(f64),
}

/// Convenience alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;
