use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("annotator id must not be blank")]
    BlankAnnotator,

    #[error("invalid window: begin {begin} is after end {end}")]
    InvalidWindow { begin: usize, end: usize },
}
