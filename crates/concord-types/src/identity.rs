use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identity of one annotator whose work takes part in a comparison.
///
/// Annotator ids are ordered so every map keyed by them iterates in the same
/// order on every run, which keeps diff output deterministic.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AnnotatorId(String);

impl AnnotatorId {
    /// Create an annotator id. Leading/trailing whitespace is removed and a
    /// blank name is rejected.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(TypeError::BlankAnnotator);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The annotator name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AnnotatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnnotatorId({})", self.0)
    }
}

impl fmt::Display for AnnotatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AnnotatorId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AnnotatorId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AnnotatorId> for String {
    fn from(id: AnnotatorId) -> Self {
        id.0
    }
}

/// Opaque handle of one annotation instance inside exactly one store.
///
/// An `Aid` only means something relative to the store that issued it. Two
/// handles with the same number taken from different annotators' stores say
/// nothing about each other; the diff engine never compares them across
/// stores and only ever turns one back into an instance through the store
/// that issued it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Aid(u32);

impl Aid {
    /// Wrap a raw store-local index.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The handle as a slot index.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Aid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aid(#{})", self.0)
    }
}

impl fmt::Display for Aid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The source document a store annotates: a collection (project) id and a
/// document id within it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentRef {
    pub collection: String,
    pub document: String,
}

impl DocumentRef {
    pub fn new(collection: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            document: document.into(),
        }
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotator_name_is_trimmed() {
        let id = AnnotatorId::new("  alice ").unwrap();
        assert_eq!(id.as_str(), "alice");
    }

    #[test]
    fn blank_annotator_is_rejected() {
        assert_eq!(AnnotatorId::new("   "), Err(TypeError::BlankAnnotator));
        assert_eq!("".parse::<AnnotatorId>(), Err(TypeError::BlankAnnotator));
    }

    #[test]
    fn annotators_order_by_name() {
        let a = AnnotatorId::new("alice").unwrap();
        let b = AnnotatorId::new("bob").unwrap();
        assert!(a < b);
    }

    #[test]
    fn annotator_serde_rejects_blank() {
        let parsed: Result<AnnotatorId, _> = serde_json::from_str("\"  \"");
        assert!(parsed.is_err());
        let ok: AnnotatorId = serde_json::from_str("\"carol\"").unwrap();
        assert_eq!(ok.to_string(), "carol");
    }

    #[test]
    fn aid_display_and_index() {
        let aid = Aid::new(42);
        assert_eq!(aid.to_string(), "#42");
        assert_eq!(aid.index(), 42);
    }

    #[test]
    fn aid_serializes_as_plain_number() {
        let json = serde_json::to_string(&Aid::new(3)).unwrap();
        assert_eq!(json, "3");
    }

    #[test]
    fn document_ref_display() {
        let doc = DocumentRef::new("news", "doc-1.txt");
        assert_eq!(doc.to_string(), "news/doc-1.txt");
    }
}
