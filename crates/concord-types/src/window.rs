use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The region of a document over which annotators are compared.
///
/// Offsets are byte offsets into the document text; spans are half-open
/// (`begin..end`). `Document` is the whole-document sentinel used for
/// document-scoped comparisons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Window {
    Span { begin: usize, end: usize },
    Document,
}

impl Window {
    /// Create a span window, rejecting `begin > end`.
    pub fn span(begin: usize, end: usize) -> Result<Self, TypeError> {
        if begin > end {
            return Err(TypeError::InvalidWindow { begin, end });
        }
        Ok(Self::Span { begin, end })
    }

    /// Returns `true` if the `begin..end` range lies completely inside the
    /// window. Every range lies inside the document window.
    pub fn contains(&self, begin: usize, end: usize) -> bool {
        match self {
            Self::Span { begin: wb, end: we } => begin >= *wb && end <= *we,
            Self::Document => true,
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Span { begin, end } => write!(f, "[{begin}..{end})"),
            Self::Document => write!(f, "[document]"),
        }
    }
}
