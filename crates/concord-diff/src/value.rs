//! Store-independent projection of the feature values being compared.
//!
//! Feature values may contain store-local handles (link targets). Those can
//! never be compared across annotators, so before comparison every value is
//! projected into a [`ComparableValue`] in which link targets are replaced by
//! their offsets.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use concord_store::{AnnotationStore, FeatureValue, LinkEntry};
use serde::{Deserialize, Serialize};

use crate::error::DiffResult;

/// A resolved link entry: role plus target offsets.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkValue {
    pub role: String,
    pub begin: usize,
    pub end: usize,
}

/// A feature value in a form that can be compared across stores.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparableValue {
    Null,
    Bool(bool),
    Integer(i64),
    Text(String),
    TextSet(BTreeSet<String>),
    /// Link entries as a sorted multiset.
    Links(Vec<LinkValue>),
    /// A link target, compared by offsets.
    Span { begin: usize, end: usize },
}

impl ComparableValue {
    /// Project a feature value, resolving link targets through `store`.
    pub fn project(store: &dyn AnnotationStore, value: &FeatureValue) -> DiffResult<Self> {
        Ok(match value {
            FeatureValue::Null => Self::Null,
            FeatureValue::Bool(b) => Self::Bool(*b),
            FeatureValue::Integer(i) => Self::Integer(*i),
            FeatureValue::Text(s) => Self::Text(s.clone()),
            FeatureValue::TextSet(set) => Self::TextSet(set.clone()),
            FeatureValue::Links(entries) => Self::Links(resolve_links(store, entries)?),
        })
    }
}

fn resolve_links(store: &dyn AnnotationStore, entries: &[LinkEntry]) -> DiffResult<Vec<LinkValue>> {
    let mut values = entries
        .iter()
        .map(|entry| {
            let (begin, end) = store.span_of(entry.target)?;
            Ok(LinkValue {
                role: entry.role.clone(),
                begin,
                end,
            })
        })
        .collect::<DiffResult<Vec<_>>>()?;
    values.sort();
    Ok(values)
}

impl fmt::Display for ComparableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::TextSet(set) => {
                let items: Vec<_> = set.iter().map(String::as_str).collect();
                write!(f, "{{{}}}", items.join(", "))
            }
            Self::Links(links) => {
                let items: Vec<_> = links
                    .iter()
                    .map(|l| format!("{}:{}..{}", l.role, l.begin, l.end))
                    .collect();
                write!(f, "[{}]", items.join(", "))
            }
            Self::Span { begin, end } => write!(f, "{begin}..{end}"),
        }
    }
}

/// The comparison-relevant values of one instance at one position, keyed by
/// feature name. Two annotators agree at a position iff their `LabelValues`
/// are equal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelValues(BTreeMap<String, ComparableValue>);

impl LabelValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values holding a single entry.
    pub fn single(name: impl Into<String>, value: ComparableValue) -> Self {
        let mut values = Self::new();
        values.insert(name, value);
        values
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ComparableValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ComparableValue> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ComparableValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, ComparableValue)> for LabelValues {
    fn from_iter<I: IntoIterator<Item = (String, ComparableValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for LabelValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(no label)");
        }
        let items: Vec<_> = self.0.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{}", items.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_store::{Annotation, InMemoryAnnotationStore};
    use concord_types::{Aid, DocumentRef};

    fn store() -> (InMemoryAnnotationStore, Aid, Aid) {
        let mut s = InMemoryAnnotationStore::new(DocumentRef::new("c", "d"), "Alice met Bob");
        let alice = s.insert(Annotation::span("Entity", 0, 5)).unwrap();
        let bob = s.insert(Annotation::span("Entity", 10, 13)).unwrap();
        (s, alice, bob)
    }

    #[test]
    fn primitive_values_project_unchanged() {
        let (s, _, _) = store();
        assert_eq!(
            ComparableValue::project(&s, &FeatureValue::text("PER")).unwrap(),
            ComparableValue::Text("PER".into())
        );
        assert_eq!(
            ComparableValue::project(&s, &FeatureValue::Null).unwrap(),
            ComparableValue::Null
        );
    }

    #[test]
    fn links_resolve_to_sorted_offsets() {
        let (s, alice, bob) = store();
        let value = FeatureValue::Links(vec![
            LinkEntry::new("theme", bob),
            LinkEntry::new("agent", alice),
        ]);
        let projected = ComparableValue::project(&s, &value).unwrap();
        assert_eq!(
            projected,
            ComparableValue::Links(vec![
                LinkValue { role: "agent".into(), begin: 0, end: 5 },
                LinkValue { role: "theme".into(), begin: 10, end: 13 },
            ])
        );
    }

    #[test]
    fn link_entry_order_does_not_matter() {
        let (s, alice, bob) = store();
        let a = FeatureValue::Links(vec![LinkEntry::new("x", alice), LinkEntry::new("y", bob)]);
        let b = FeatureValue::Links(vec![LinkEntry::new("y", bob), LinkEntry::new("x", alice)]);
        assert_eq!(
            ComparableValue::project(&s, &a).unwrap(),
            ComparableValue::project(&s, &b).unwrap()
        );
    }

    #[test]
    fn dangling_link_target_is_a_store_error() {
        let (s, _, _) = store();
        let value = FeatureValue::Links(vec![LinkEntry::new("agent", Aid::new(40))]);
        let err = ComparableValue::project(&s, &value).unwrap_err();
        assert!(err.is_annotator_fault());
    }

    #[test]
    fn label_values_display() {
        let mut values = LabelValues::new();
        values.insert("value", ComparableValue::Text("PER".into()));
        values.insert("rank", ComparableValue::Integer(2));
        assert_eq!(values.to_string(), "rank=2, value=\"PER\"");
        assert_eq!(LabelValues::new().to_string(), "(no label)");
    }
}
