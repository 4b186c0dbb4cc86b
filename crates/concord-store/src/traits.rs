use concord_types::{Aid, DocumentRef};

use crate::annotation::{Annotation, LinkEntry};
use crate::error::{StoreError, StoreResult};

/// Read boundary over one annotator's annotations on one document.
///
/// All implementations must satisfy these invariants:
/// - The store is an immutable snapshot for as long as a reader holds it.
/// - Handles are stable: `resolve(aid)` always yields the same instance.
/// - Handles are local: an `Aid` is only meaningful to the store that issued
///   it and is never used to address another store.
/// - Concurrent reads are always safe.
pub trait AnnotationStore: Send + Sync {
    /// The document this store annotates.
    fn document(&self) -> &DocumentRef;

    /// The full document text.
    fn text(&self) -> &str;

    /// Turn a handle back into its instance.
    ///
    /// Returns `Err(UnknownHandle)` if this store never issued `aid`.
    fn resolve(&self, aid: Aid) -> StoreResult<&Annotation>;

    /// Handles of every instance of `type_name`, in ascending handle order.
    fn select(&self, type_name: &str) -> StoreResult<Vec<Aid>>;

    /// The text covered by `begin..end`.
    fn covered_text(&self, begin: usize, end: usize) -> StoreResult<&str> {
        let text = self.text();
        text.get(begin..end).ok_or(StoreError::OffsetsOutOfBounds {
            begin,
            end,
            len: text.len(),
        })
    }

    /// Offsets of a span-anchored instance.
    fn span_of(&self, aid: Aid) -> StoreResult<(usize, usize)> {
        self.resolve(aid)?
            .anchor
            .span()
            .ok_or(StoreError::NotSpanAnchored(aid))
    }
}

/// Write boundary for the store a curator builds from merge decisions.
///
/// Handles returned by a curated store belong to the curated store; they are
/// unrelated to the handles of the annotator stores instances were copied
/// from.
pub trait CuratedStore {
    /// Append an instance and return its new handle. Relation endpoints and
    /// link targets must already be handles of this store.
    fn add(&mut self, annotation: Annotation) -> StoreResult<Aid>;

    /// Find a span-anchored instance of `type_name` at exactly `begin..end`.
    fn find_span(&self, type_name: &str, begin: usize, end: usize) -> Option<Aid>;

    /// Append one entry to a link-valued feature of an existing instance.
    fn add_link(&mut self, host: Aid, feature: &str, entry: LinkEntry) -> StoreResult<()>;
}
