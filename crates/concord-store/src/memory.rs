use concord_types::{Aid, DocumentRef};
use serde::{Deserialize, Serialize};

use crate::annotation::{Anchor, Annotation, FeatureValue, LinkEntry};
use crate::error::{StoreError, StoreResult};
use crate::traits::{AnnotationStore, CuratedStore};

/// In-memory, `Vec`-based annotation store.
///
/// An instance's handle is its slot index. Instances are never removed, so
/// handles stay valid for the life of the store. Used for tests, JSON
/// fixtures, and as the curated output of a merge.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryAnnotationStore {
    document: DocumentRef,
    text: String,
    #[serde(default)]
    annotations: Vec<Annotation>,
}

impl InMemoryAnnotationStore {
    /// Create an empty store for a document.
    pub fn new(document: DocumentRef, text: impl Into<String>) -> Self {
        Self {
            document,
            text: text.into(),
            annotations: Vec::new(),
        }
    }

    /// Parse a store from JSON and check it is well formed.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        let store: Self = serde_json::from_str(json)?;
        store.validate()?;
        Ok(store)
    }

    /// Serialize the store to pretty-printed JSON.
    pub fn to_json(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Append an instance after checking its offsets and references.
    pub fn insert(&mut self, annotation: Annotation) -> StoreResult<Aid> {
        let aid = Aid::new(self.annotations.len() as u32);
        self.check(aid, &annotation)?;
        self.annotations.push(annotation);
        Ok(aid)
    }

    /// Check every instance: span offsets lie on the text, and every relation
    /// endpoint and link target names a span-anchored instance.
    pub fn validate(&self) -> StoreResult<()> {
        for (idx, annotation) in self.annotations.iter().enumerate() {
            self.check(Aid::new(idx as u32), annotation)?;
        }
        Ok(())
    }

    /// Number of instances in the store.
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    /// Returns `true` if the store holds no instances.
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Iterate `(handle, instance)` pairs in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (Aid, &Annotation)> {
        self.annotations
            .iter()
            .enumerate()
            .map(|(idx, a)| (Aid::new(idx as u32), a))
    }

    fn check(&self, aid: Aid, annotation: &Annotation) -> StoreResult<()> {
        if let Anchor::Span { begin, end } = annotation.anchor {
            if begin > end || self.text.get(begin..end).is_none() {
                return Err(StoreError::OffsetsOutOfBounds {
                    begin,
                    end,
                    len: self.text.len(),
                });
            }
        }
        for target in annotation.references() {
            match self.annotations.get(target.index()) {
                None => return Err(StoreError::DanglingReference { aid, target }),
                Some(referenced) if referenced.anchor.span().is_none() => {
                    return Err(StoreError::NotSpanAnchored(target));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

impl AnnotationStore for InMemoryAnnotationStore {
    fn document(&self) -> &DocumentRef {
        &self.document
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn resolve(&self, aid: Aid) -> StoreResult<&Annotation> {
        self.annotations
            .get(aid.index())
            .ok_or(StoreError::UnknownHandle(aid))
    }

    fn select(&self, type_name: &str) -> StoreResult<Vec<Aid>> {
        Ok(self
            .iter()
            .filter(|(_, a)| a.type_name == type_name)
            .map(|(aid, _)| aid)
            .collect())
    }
}

impl CuratedStore for InMemoryAnnotationStore {
    fn add(&mut self, annotation: Annotation) -> StoreResult<Aid> {
        self.insert(annotation)
    }

    fn find_span(&self, type_name: &str, begin: usize, end: usize) -> Option<Aid> {
        self.iter()
            .find(|(_, a)| a.type_name == type_name && a.anchor.span() == Some((begin, end)))
            .map(|(aid, _)| aid)
    }

    fn add_link(&mut self, host: Aid, feature: &str, entry: LinkEntry) -> StoreResult<()> {
        match self.annotations.get(entry.target.index()) {
            None => {
                return Err(StoreError::DanglingReference {
                    aid: host,
                    target: entry.target,
                })
            }
            Some(target) if target.anchor.span().is_none() => {
                return Err(StoreError::NotSpanAnchored(entry.target));
            }
            Some(_) => {}
        }

        let annotation = self
            .annotations
            .get_mut(host.index())
            .ok_or(StoreError::UnknownHandle(host))?;
        let slot = annotation
            .features
            .entry(feature.to_string())
            .or_insert_with(|| FeatureValue::Links(Vec::new()));
        if slot.is_null() {
            *slot = FeatureValue::Links(Vec::new());
        }
        match slot {
            FeatureValue::Links(entries) => {
                entries.push(entry);
                Ok(())
            }
            _ => Err(StoreError::FeatureTypeMismatch {
                aid: host,
                feature: feature.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for InMemoryAnnotationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryAnnotationStore")
            .field("document", &self.document)
            .field("annotation_count", &self.annotations.len())
            .finish()
    }
}
