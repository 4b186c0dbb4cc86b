//! Structural positions: the key that decides which instances are compared.
//!
//! Two instances from different annotators are "at the same place" iff
//! their [`Position`]s are equal. Equality is the whole contract: every field
//! of a position variant takes part in `Eq`, `Hash` and `Ord`, and nothing
//! else does. Positions are immutable once built.
//!
//! Field order inside each variant is chosen so the derived ordering sorts
//! positions by text offset first, which keeps rendered output readable.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a multi-valued link feature is compared across annotators.
///
/// - `ExactSet`: the feature's entries are compared together, as one sorted
///   multiset of `(role, target begin, target end)` that is part of the host
///   instance's label values. The feature produces no sub-positions.
/// - `TargetAsLabel`: every entry gets its own [`LinkPosition`] keyed by the
///   role; annotators agree when they linked the same target in that role.
/// - `RoleAsLabel`: every entry gets its own [`LinkPosition`] keyed by the
///   link target's offsets and covered text; annotators agree when they gave
///   the same role to that target.
///
/// In both per-entry modes the feature is left out of the host comparison,
/// so hosts can agree while individual links disagree.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LinkCompareMode {
    #[default]
    ExactSet,
    TargetAsLabel,
    RoleAsLabel,
}

impl LinkCompareMode {
    /// Returns `true` for the modes that produce one sub-position per entry.
    pub fn is_per_entry(&self) -> bool {
        !matches!(self, Self::ExactSet)
    }
}

impl fmt::Display for LinkCompareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExactSet => write!(f, "exact-set"),
            Self::TargetAsLabel => write!(f, "target-as-label"),
            Self::RoleAsLabel => write!(f, "role-as-label"),
        }
    }
}

/// A span-anchored instance's place: exact offsets.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpanPosition {
    pub begin: usize,
    pub end: usize,
    pub type_name: String,
}

/// A relation's place: the offsets of both endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationPosition {
    pub target_begin: usize,
    pub target_end: usize,
    pub source_begin: usize,
    pub source_end: usize,
    pub type_name: String,
}

/// A document-metadata instance's place: the document itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentPosition {
    pub collection: String,
    pub document: String,
    pub type_name: String,
}

/// The span a link entry points at.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkTarget {
    pub begin: usize,
    pub end: usize,
    pub text: String,
}

/// One entry of a per-entry link feature, below its host's position.
///
/// Exactly one of `role` / `target` is set, as dictated by `mode`:
/// `TargetAsLabel` keys on the role, `RoleAsLabel` keys on the target.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkPosition {
    pub host: Box<Position>,
    pub feature: String,
    pub mode: LinkCompareMode,
    pub role: Option<String>,
    pub target: Option<LinkTarget>,
}

/// Type-tagged structural key defining "same place" across annotators.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Position {
    Span(SpanPosition),
    Relation(RelationPosition),
    LinkRole(LinkPosition),
    Document(DocumentPosition),
}

impl Position {
    pub fn span(type_name: impl Into<String>, begin: usize, end: usize) -> Self {
        Self::Span(SpanPosition {
            begin,
            end,
            type_name: type_name.into(),
        })
    }

    pub fn relation(
        type_name: impl Into<String>,
        source: (usize, usize),
        target: (usize, usize),
    ) -> Self {
        Self::Relation(RelationPosition {
            target_begin: target.0,
            target_end: target.1,
            source_begin: source.0,
            source_end: source.1,
            type_name: type_name.into(),
        })
    }

    pub fn document(
        type_name: impl Into<String>,
        collection: impl Into<String>,
        document: impl Into<String>,
    ) -> Self {
        Self::Document(DocumentPosition {
            collection: collection.into(),
            document: document.into(),
            type_name: type_name.into(),
        })
    }

    /// The annotation type compared at this position. For link positions this
    /// is the host's type.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Span(p) => &p.type_name,
            Self::Relation(p) => &p.type_name,
            Self::LinkRole(p) => p.host.type_name(),
            Self::Document(p) => &p.type_name,
        }
    }

    /// The link feature name, for link positions.
    pub fn feature(&self) -> Option<&str> {
        match self {
            Self::LinkRole(p) => Some(&p.feature),
            _ => None,
        }
    }

    /// The role this position is keyed on, for `TargetAsLabel` link positions.
    pub fn role(&self) -> Option<&str> {
        match self {
            Self::LinkRole(p) => p.role.as_deref(),
            _ => None,
        }
    }

    /// The link target this position is keyed on, for `RoleAsLabel` link
    /// positions.
    pub fn link_target(&self) -> Option<&LinkTarget> {
        match self {
            Self::LinkRole(p) => p.target.as_ref(),
            _ => None,
        }
    }

    /// The host position of a link position.
    pub fn host(&self) -> Option<&Position> {
        match self {
            Self::LinkRole(p) => Some(&p.host),
            _ => None,
        }
    }

    pub fn is_link(&self) -> bool {
        matches!(self, Self::LinkRole(_))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Span(p) => write!(f, "{}@{}..{}", p.type_name, p.begin, p.end),
            Self::Relation(p) => write!(
                f,
                "{}@{}..{}->{}..{}",
                p.type_name, p.source_begin, p.source_end, p.target_begin, p.target_end
            ),
            Self::LinkRole(p) => {
                write!(f, "{}.{}", p.host, p.feature)?;
                if let Some(role) = &p.role {
                    write!(f, "[role={role}]")?;
                }
                if let Some(t) = &p.target {
                    write!(f, "[target={}..{} \"{}\"]", t.begin, t.end, t.text)?;
                }
                Ok(())
            }
            Self::Document(p) => write!(f, "{}@{}/{}", p.type_name, p.collection, p.document),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn link(host: Position, role: Option<&str>, target: Option<(usize, usize, &str)>) -> Position {
        let mode = if role.is_some() {
            LinkCompareMode::TargetAsLabel
        } else {
            LinkCompareMode::RoleAsLabel
        };
        Position::LinkRole(LinkPosition {
            host: Box::new(host),
            feature: "args".into(),
            mode,
            role: role.map(String::from),
            target: target.map(|(begin, end, text)| LinkTarget {
                begin,
                end,
                text: text.into(),
            }),
        })
    }

    #[test]
    fn span_equality_is_type_and_offsets() {
        assert_eq!(Position::span("Entity", 0, 5), Position::span("Entity", 0, 5));
        assert_ne!(Position::span("Entity", 0, 5), Position::span("Entity", 0, 4));
        assert_ne!(Position::span("Entity", 0, 5), Position::span("Token", 0, 5));
    }

    #[test]
    fn relation_equality_includes_both_endpoints() {
        let a = Position::relation("Dep", (0, 5), (10, 13));
        let b = Position::relation("Dep", (0, 5), (10, 13));
        let c = Position::relation("Dep", (6, 9), (10, 13));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn link_positions_keyed_by_role_or_target() {
        let host = Position::span("Pred", 6, 9);
        let by_role_a = link(host.clone(), Some("agent"), None);
        let by_role_b = link(host.clone(), Some("agent"), None);
        let by_role_c = link(host.clone(), Some("theme"), None);
        assert_eq!(by_role_a, by_role_b);
        assert_ne!(by_role_a, by_role_c);

        let by_target = link(host.clone(), None, Some((0, 5, "Alice")));
        assert_ne!(by_role_a, by_target);
        assert_eq!(by_target.type_name(), "Pred");
        assert_eq!(by_target.host(), Some(&host));
        assert_eq!(by_target.link_target().unwrap().text, "Alice");
        assert_eq!(by_role_a.role(), Some("agent"));
    }

    #[test]
    fn document_position_ignores_offsets() {
        let p = Position::document("Meta", "news", "doc-1");
        assert_eq!(p, Position::document("Meta", "news", "doc-1"));
        assert_ne!(p, Position::document("Meta", "news", "doc-2"));
    }

    #[test]
    fn hash_agrees_with_equality() {
        let mut set = HashSet::new();
        set.insert(Position::span("Entity", 0, 5));
        set.insert(Position::span("Entity", 0, 5));
        set.insert(Position::span("Entity", 6, 9));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn spans_order_by_offset_before_type() {
        let mut positions = vec![
            Position::span("Zeta", 10, 12),
            Position::span("Alpha", 20, 22),
            Position::span("Alpha", 0, 3),
        ];
        positions.sort();
        assert_eq!(positions[0], Position::span("Alpha", 0, 3));
        assert_eq!(positions[1], Position::span("Zeta", 10, 12));
    }

    #[test]
    fn display_formats() {
        assert_eq!(Position::span("Entity", 0, 5).to_string(), "Entity@0..5");
        assert_eq!(
            Position::relation("Dep", (0, 5), (10, 13)).to_string(),
            "Dep@0..5->10..13"
        );
        let l = link(Position::span("Pred", 6, 9), Some("agent"), None);
        assert_eq!(l.to_string(), "Pred@6..9.args[role=agent]");
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(Position::span("Entity", 0, 5)).unwrap();
        assert_eq!(json["kind"], "span");
        assert_eq!(json["begin"], 0);
    }

    #[test]
    fn per_entry_modes() {
        assert!(!LinkCompareMode::ExactSet.is_per_entry());
        assert!(LinkCompareMode::TargetAsLabel.is_per_entry());
        assert!(LinkCompareMode::RoleAsLabel.is_per_entry());
    }
}
