use concord_diff::{Configuration, ConfigurationSet};
use concord_types::DocumentRef;

// ---------------------------------------------------------------------------
// MergeContext
// ---------------------------------------------------------------------------

/// What a strategy may know about the unit of work beyond the set itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeContext {
    /// Number of annotators compared (skipped annotators excluded).
    pub annotator_count: usize,
    /// The document being curated, when known.
    pub document: Option<DocumentRef>,
}

impl MergeContext {
    pub fn new(annotator_count: usize) -> Self {
        Self {
            annotator_count,
            document: None,
        }
    }

    pub fn with_document(mut self, document: DocumentRef) -> Self {
        self.document = Some(document);
        self
    }
}

// ---------------------------------------------------------------------------
// MergeStrategy trait
// ---------------------------------------------------------------------------

/// Decides which configuration at a position is adopted by the curator.
///
/// Implementations must be stateless and deterministic: the same set and
/// context always yield the same choice. The trait is object-safe and
/// `Send + Sync` so a strategy can be shared by parallel curation units.
pub trait MergeStrategy: Send + Sync {
    /// Short name of the strategy (e.g., "threshold", "manual").
    fn name(&self) -> &str;

    /// The configuration to merge, or `None` to leave the position for
    /// manual curation.
    fn choose_configuration_to_merge<'s>(
        &self,
        context: &MergeContext,
        set: &'s ConfigurationSet,
    ) -> Option<&'s Configuration>;
}
