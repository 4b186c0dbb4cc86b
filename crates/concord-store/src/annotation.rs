use std::collections::{BTreeMap, BTreeSet};

use concord_types::Aid;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Anchor
// ---------------------------------------------------------------------------

/// Where an annotation instance is attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anchor {
    /// A half-open byte range of the document text.
    Span { begin: usize, end: usize },
    /// A directed edge between two span-anchored instances of the same store.
    Relation { source: Aid, target: Aid },
    /// The document as a whole (document metadata).
    Document,
}

impl Anchor {
    /// The span offsets, if this is a span anchor.
    pub fn span(&self) -> Option<(usize, usize)> {
        match self {
            Self::Span { begin, end } => Some((*begin, *end)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Anchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Span { begin, end } => write!(f, "span {begin}..{end}"),
            Self::Relation { source, target } => write!(f, "relation {source} -> {target}"),
            Self::Document => write!(f, "document"),
        }
    }
}

// ---------------------------------------------------------------------------
// Feature values
// ---------------------------------------------------------------------------

/// One entry of a link-valued feature: a role name and the store-local
/// handle of the span-anchored target.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkEntry {
    pub role: String,
    pub target: Aid,
}

impl LinkEntry {
    pub fn new(role: impl Into<String>, target: Aid) -> Self {
        Self {
            role: role.into(),
            target,
        }
    }
}

/// The value of one feature of an annotation instance.
///
/// Floating point values are intentionally absent: comparison across
/// annotators needs exact equality.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Text(String),
    /// A multi-valued link feature (e.g. semantic-role arguments).
    ///
    /// Listed before `TextSet` so an empty JSON array reads back as an
    /// empty link list.
    Links(Vec<LinkEntry>),
    /// A multi-valued primitive feature (e.g. a set of tags).
    TextSet(BTreeSet<String>),
}

impl FeatureValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn text_set<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::TextSet(values.into_iter().map(Into::into).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The link entries, if this is a link-valued feature.
    pub fn links(&self) -> Option<&[LinkEntry]> {
        match self {
            Self::Links(entries) => Some(entries),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Annotation
// ---------------------------------------------------------------------------

/// One annotation instance inside one annotator's store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// The annotation type (layer) name, e.g. `"NamedEntity"`.
    pub type_name: String,
    pub anchor: Anchor,
    #[serde(default)]
    pub features: BTreeMap<String, FeatureValue>,
}

impl Annotation {
    /// A span-anchored instance without features.
    pub fn span(type_name: impl Into<String>, begin: usize, end: usize) -> Self {
        Self {
            type_name: type_name.into(),
            anchor: Anchor::Span { begin, end },
            features: BTreeMap::new(),
        }
    }

    /// A relation between two span-anchored instances of the same store.
    pub fn relation(type_name: impl Into<String>, source: Aid, target: Aid) -> Self {
        Self {
            type_name: type_name.into(),
            anchor: Anchor::Relation { source, target },
            features: BTreeMap::new(),
        }
    }

    /// A document-metadata instance.
    pub fn document(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            anchor: Anchor::Document,
            features: BTreeMap::new(),
        }
    }

    /// Builder: set a feature value.
    pub fn with_feature(mut self, name: impl Into<String>, value: FeatureValue) -> Self {
        self.features.insert(name.into(), value);
        self
    }

    /// The value of a feature; absent features read as [`FeatureValue::Null`].
    pub fn feature(&self, name: &str) -> &FeatureValue {
        static NULL: FeatureValue = FeatureValue::Null;
        self.features.get(name).unwrap_or(&NULL)
    }

    /// Handles this instance refers to (relation endpoints and link targets).
    pub fn references(&self) -> Vec<Aid> {
        let mut refs = Vec::new();
        if let Anchor::Relation { source, target } = self.anchor {
            refs.push(source);
            refs.push(target);
        }
        for value in self.features.values() {
            if let Some(links) = value.links() {
                refs.extend(links.iter().map(|l| l.target));
            }
        }
        refs
    }
}
