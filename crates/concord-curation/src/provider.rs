use std::collections::BTreeMap;
use std::sync::Arc;

use concord_store::{AnnotationStore, InMemoryAnnotationStore, StoreError, StoreResult};
use concord_types::{AnnotatorId, DocumentRef};
use serde::{Deserialize, Serialize};

/// Supplies each annotator's store for a document.
///
/// Loading may fail for one annotator without affecting the others; the
/// curator logs the failure and leaves that annotator out of the unit of
/// work.
pub trait StoreProvider: Send + Sync {
    /// Documents this provider can supply, in a stable order.
    fn documents(&self) -> Vec<DocumentRef>;

    /// Annotators who worked on the document, in id order.
    fn annotators(&self, document: &DocumentRef) -> Vec<AnnotatorId>;

    /// Load one annotator's store for the document.
    fn load(
        &self,
        annotator: &AnnotatorId,
        document: &DocumentRef,
    ) -> StoreResult<Arc<dyn AnnotationStore>>;
}

/// On-disk shape of a project fixture: every annotator's stores.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProjectFile {
    pub annotators: BTreeMap<AnnotatorId, Vec<InMemoryAnnotationStore>>,
}

/// Provider backed by in-memory stores.
///
/// Stores are checked when loaded, not when added, so a malformed store
/// surfaces as a load failure for its annotator only.
#[derive(Clone, Default)]
pub struct InMemoryStoreProvider {
    stores: BTreeMap<DocumentRef, BTreeMap<AnnotatorId, Arc<InMemoryAnnotationStore>>>,
}

impl InMemoryStoreProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) an annotator's store for the store's document.
    pub fn insert(&mut self, annotator: AnnotatorId, store: InMemoryAnnotationStore) {
        self.stores
            .entry(AnnotationStore::document(&store).clone())
            .or_default()
            .insert(annotator, Arc::new(store));
    }

    pub fn from_project(project: ProjectFile) -> Self {
        let mut provider = Self::new();
        for (annotator, stores) in project.annotators {
            for store in stores {
                provider.insert(annotator.clone(), store);
            }
        }
        provider
    }

    /// Parse a project fixture without checking the stores.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        let project: ProjectFile = serde_json::from_str(json)?;
        Ok(Self::from_project(project))
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

impl StoreProvider for InMemoryStoreProvider {
    fn documents(&self) -> Vec<DocumentRef> {
        self.stores.keys().cloned().collect()
    }

    fn annotators(&self, document: &DocumentRef) -> Vec<AnnotatorId> {
        self.stores
            .get(document)
            .map(|by_annotator| by_annotator.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn load(
        &self,
        annotator: &AnnotatorId,
        document: &DocumentRef,
    ) -> StoreResult<Arc<dyn AnnotationStore>> {
        let store = self
            .stores
            .get(document)
            .and_then(|by_annotator| by_annotator.get(annotator))
            .ok_or_else(|| StoreError::Unavailable(format!("no store for {annotator} on {document}")))?;
        store.validate()?;
        Ok(Arc::clone(store) as Arc<dyn AnnotationStore>)
    }
}

impl std::fmt::Debug for InMemoryStoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStoreProvider")
            .field("document_count", &self.stores.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"{
        "annotators": {
            "alice": [{
                "document": {"collection": "news", "document": "doc-1"},
                "text": "Alice met Bob",
                "annotations": [
                    {"type_name": "Entity", "anchor": {"kind": "span", "begin": 0, "end": 5},
                     "features": {"value": "PER"}}
                ]
            }],
            "bob": [{
                "document": {"collection": "news", "document": "doc-1"},
                "text": "Alice met Bob",
                "annotations": [
                    {"type_name": "Rel", "anchor": {"kind": "relation", "source": 0, "target": 3}}
                ]
            }]
        }
    }"#;

    fn doc() -> DocumentRef {
        DocumentRef::new("news", "doc-1")
    }

    #[test]
    fn lists_documents_and_annotators() {
        let provider = InMemoryStoreProvider::from_json(PROJECT).unwrap();
        assert_eq!(provider.documents(), vec![doc()]);
        let names: Vec<_> = provider
            .annotators(&doc())
            .iter()
            .map(|a| a.to_string())
            .collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[test]
    fn malformed_store_fails_only_on_load() {
        let provider = InMemoryStoreProvider::from_json(PROJECT).unwrap();
        let alice = AnnotatorId::new("alice").unwrap();
        let bob = AnnotatorId::new("bob").unwrap();
        assert_eq!(provider.load(&alice, &doc()).unwrap().select("Entity").unwrap().len(), 1);
        assert!(provider.load(&bob, &doc()).is_err());
    }

    #[test]
    fn unknown_document_is_unavailable() {
        let provider = InMemoryStoreProvider::from_json(PROJECT).unwrap();
        let alice = AnnotatorId::new("alice").unwrap();
        let missing = DocumentRef::new("news", "doc-9");
        assert!(provider.annotators(&missing).is_empty());
        assert!(matches!(
            provider.load(&alice, &missing),
            Err(StoreError::Unavailable(_))
        ));
    }
}
