//! Diff adapters: per-type knowledge of how instances are selected and
//! where they sit.
//!
//! Each annotation type taking part in a diff has exactly one adapter,
//! looked up by type name in an [`AdapterRegistry`]. The adapter decides
//! which instances fall inside a window and computes their [`Position`].

use std::collections::BTreeMap;

use concord_store::{Anchor, Annotation, AnnotationStore};
use concord_types::{Aid, Window};

use crate::error::{DiffError, DiffResult};
use crate::position::{LinkCompareMode, LinkPosition, LinkTarget, Position};
use crate::value::{ComparableValue, LabelValues};

// ---------------------------------------------------------------------------
// Link features
// ---------------------------------------------------------------------------

/// Identifies one entry of a per-entry link feature when asking for its
/// sub-position.
///
/// `TargetAsLabel` positions need `role`; `RoleAsLabel` positions need
/// `target`. Selectors produced by [`LinkRoleAdapter::selectors`] carry both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkSelector {
    pub feature: String,
    pub mode: LinkCompareMode,
    pub role: Option<String>,
    pub target: Option<LinkTarget>,
}

/// Comparison settings for one link feature of a type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkRoleAdapter {
    feature: String,
    mode: LinkCompareMode,
}

impl LinkRoleAdapter {
    pub fn new(feature: impl Into<String>, mode: LinkCompareMode) -> Self {
        Self {
            feature: feature.into(),
            mode,
        }
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    pub fn mode(&self) -> LinkCompareMode {
        self.mode
    }

    /// One selector per entry of this feature on `annotation`, with link
    /// targets resolved to their offsets and covered text.
    pub fn selectors(
        &self,
        store: &dyn AnnotationStore,
        annotation: &Annotation,
    ) -> DiffResult<Vec<LinkSelector>> {
        let Some(entries) = annotation.feature(&self.feature).links() else {
            return Ok(Vec::new());
        };
        entries
            .iter()
            .map(|entry| {
                let (begin, end) = store.span_of(entry.target)?;
                let text = store.covered_text(begin, end)?.to_string();
                Ok(LinkSelector {
                    feature: self.feature.clone(),
                    mode: self.mode,
                    role: Some(entry.role.clone()),
                    target: Some(LinkTarget { begin, end, text }),
                })
            })
            .collect()
    }

    /// The value compared at the sub-position of `selector`: the target
    /// offsets when keyed by role, the role when keyed by target.
    pub fn value_of(&self, type_name: &str, selector: &LinkSelector) -> DiffResult<LabelValues> {
        match self.mode {
            LinkCompareMode::TargetAsLabel => {
                let target = selector.target.as_ref().ok_or_else(|| {
                    invalid_link(type_name, &self.feature, "no link target to compare")
                })?;
                Ok(LabelValues::single(
                    "target",
                    ComparableValue::Span {
                        begin: target.begin,
                        end: target.end,
                    },
                ))
            }
            LinkCompareMode::RoleAsLabel => {
                let role = selector.role.as_ref().ok_or_else(|| {
                    invalid_link(type_name, &self.feature, "no role to compare")
                })?;
                Ok(LabelValues::single("role", ComparableValue::Text(role.clone())))
            }
            LinkCompareMode::ExactSet => Err(invalid_link(
                type_name,
                &self.feature,
                "exact-set features have no sub-positions",
            )),
        }
    }
}

fn invalid_link(type_name: &str, feature: &str, reason: &str) -> DiffError {
    DiffError::InvalidLinkRequest {
        type_name: type_name.to_string(),
        feature: feature.to_string(),
        reason: reason.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Adapter variants
// ---------------------------------------------------------------------------

/// Adapter for span-anchored types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpanAdapter {
    type_name: String,
    links: Vec<LinkRoleAdapter>,
}

impl SpanAdapter {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            links: Vec::new(),
        }
    }

    pub fn with_link(mut self, feature: impl Into<String>, mode: LinkCompareMode) -> Self {
        push_link(&mut self.links, LinkRoleAdapter::new(feature, mode));
        self
    }
}

/// Adapter for relation-anchored types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationAdapter {
    type_name: String,
    links: Vec<LinkRoleAdapter>,
}

impl RelationAdapter {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            links: Vec::new(),
        }
    }

    pub fn with_link(mut self, feature: impl Into<String>, mode: LinkCompareMode) -> Self {
        push_link(&mut self.links, LinkRoleAdapter::new(feature, mode));
        self
    }
}

/// Adapter for document-scoped metadata types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentMetadataAdapter {
    type_name: String,
    links: Vec<LinkRoleAdapter>,
}

impl DocumentMetadataAdapter {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            links: Vec::new(),
        }
    }

    pub fn with_link(mut self, feature: impl Into<String>, mode: LinkCompareMode) -> Self {
        push_link(&mut self.links, LinkRoleAdapter::new(feature, mode));
        self
    }
}

fn push_link(links: &mut Vec<LinkRoleAdapter>, link: LinkRoleAdapter) {
    links.retain(|existing| existing.feature != link.feature);
    links.push(link);
}

/// The closed set of adapter kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffAdapter {
    Span(SpanAdapter),
    Relation(RelationAdapter),
    Document(DocumentMetadataAdapter),
}

impl From<SpanAdapter> for DiffAdapter {
    fn from(adapter: SpanAdapter) -> Self {
        Self::Span(adapter)
    }
}

impl From<RelationAdapter> for DiffAdapter {
    fn from(adapter: RelationAdapter) -> Self {
        Self::Relation(adapter)
    }
}

impl From<DocumentMetadataAdapter> for DiffAdapter {
    fn from(adapter: DocumentMetadataAdapter) -> Self {
        Self::Document(adapter)
    }
}

impl DiffAdapter {
    pub fn type_name(&self) -> &str {
        match self {
            Self::Span(a) => &a.type_name,
            Self::Relation(a) => &a.type_name,
            Self::Document(a) => &a.type_name,
        }
    }

    /// All link features configured for this type.
    pub fn links(&self) -> &[LinkRoleAdapter] {
        match self {
            Self::Span(a) => &a.links,
            Self::Relation(a) => &a.links,
            Self::Document(a) => &a.links,
        }
    }

    /// The link features compared entry by entry.
    pub fn per_entry_links(&self) -> impl Iterator<Item = &LinkRoleAdapter> {
        self.links().iter().filter(|l| l.mode.is_per_entry())
    }

    pub fn link(&self, feature: &str) -> Option<&LinkRoleAdapter> {
        self.links().iter().find(|l| l.feature == feature)
    }

    /// Short name of the anchoring this adapter expects.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Span(_) => "span",
            Self::Relation(_) => "relation",
            Self::Document(_) => "document",
        }
    }

    /// Handles of this type's instances that fall inside `window`, in
    /// ascending handle order.
    ///
    /// Spans must lie completely inside the window. Relations are selected
    /// by their target endpoint. Document metadata ignores the window.
    pub fn select_in_window(
        &self,
        store: &dyn AnnotationStore,
        window: &Window,
    ) -> DiffResult<Vec<Aid>> {
        let candidates = store.select(self.type_name())?;
        if let Self::Document(_) = self {
            return Ok(candidates);
        }

        let mut selected = Vec::with_capacity(candidates.len());
        for aid in candidates {
            let annotation = store.resolve(aid)?;
            let (begin, end) = match (self, &annotation.anchor) {
                (Self::Span(_), Anchor::Span { begin, end }) => (*begin, *end),
                (Self::Relation(_), Anchor::Relation { target, .. }) => store.span_of(*target)?,
                _ => return Err(self.mismatch(aid)),
            };
            if window.contains(begin, end) {
                selected.push(aid);
            }
        }
        Ok(selected)
    }

    /// Compute the position of an instance, or of one entry of one of its
    /// per-entry link features when `link` is given.
    pub fn position_of(
        &self,
        store: &dyn AnnotationStore,
        aid: Aid,
        annotation: &Annotation,
        link: Option<&LinkSelector>,
    ) -> DiffResult<Position> {
        let host = self.host_position(store, aid, annotation)?;
        let Some(selector) = link else {
            return Ok(host);
        };

        let adapter = self
            .link(&selector.feature)
            .ok_or_else(|| invalid_link(self.type_name(), &selector.feature, "not a link feature"))?;
        if !adapter.mode.is_per_entry() {
            return Err(invalid_link(
                self.type_name(),
                &selector.feature,
                "exact-set features have no sub-positions",
            ));
        }
        if adapter.mode != selector.mode {
            return Err(invalid_link(
                self.type_name(),
                &selector.feature,
                &format!("feature is compared {}, not {}", adapter.mode, selector.mode),
            ));
        }

        let (role, target) = match selector.mode {
            LinkCompareMode::TargetAsLabel => {
                let role = selector
                    .role
                    .clone()
                    .ok_or_else(|| invalid_link(self.type_name(), &selector.feature, "missing role"))?;
                (Some(role), None)
            }
            _ => {
                let target = selector.target.clone().ok_or_else(|| {
                    invalid_link(self.type_name(), &selector.feature, "missing link target")
                })?;
                (None, Some(target))
            }
        };

        Ok(Position::LinkRole(LinkPosition {
            host: Box::new(host),
            feature: selector.feature.clone(),
            mode: selector.mode,
            role,
            target,
        }))
    }

    /// The label values compared at the instance's own position: the listed
    /// label features plus every exact-set link feature. Per-entry link
    /// features are compared at their sub-positions instead.
    pub fn label_values<'f>(
        &self,
        store: &dyn AnnotationStore,
        annotation: &Annotation,
        label_features: impl IntoIterator<Item = &'f String>,
    ) -> DiffResult<LabelValues> {
        let mut values = LabelValues::new();
        for name in label_features {
            if self.link(name).is_some_and(|l| l.mode.is_per_entry()) {
                continue;
            }
            values.insert(
                name.clone(),
                ComparableValue::project(store, annotation.feature(name))?,
            );
        }
        for link in self.links().iter().filter(|l| !l.mode.is_per_entry()) {
            values.insert(
                link.feature.clone(),
                ComparableValue::project(store, annotation.feature(&link.feature))?,
            );
        }
        Ok(values)
    }

    fn host_position(
        &self,
        store: &dyn AnnotationStore,
        aid: Aid,
        annotation: &Annotation,
    ) -> DiffResult<Position> {
        match (self, &annotation.anchor) {
            (Self::Span(a), Anchor::Span { begin, end }) => {
                Ok(Position::span(a.type_name.clone(), *begin, *end))
            }
            (Self::Relation(a), Anchor::Relation { source, target }) => Ok(Position::relation(
                a.type_name.clone(),
                store.span_of(*source)?,
                store.span_of(*target)?,
            )),
            (Self::Document(a), Anchor::Document) => {
                let doc = store.document();
                Ok(Position::document(
                    a.type_name.clone(),
                    doc.collection.clone(),
                    doc.document.clone(),
                ))
            }
            _ => Err(self.mismatch(aid)),
        }
    }

    fn mismatch(&self, aid: Aid) -> DiffError {
        DiffError::AnchorMismatch {
            aid,
            type_name: self.type_name().to_string(),
            expected: self.kind(),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Adapters keyed by the type name they handle.
#[derive(Clone, Debug, Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<String, DiffAdapter>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter. A type can only be registered once.
    pub fn register(&mut self, adapter: impl Into<DiffAdapter>) -> DiffResult<()> {
        let adapter = adapter.into();
        let name = adapter.type_name().to_string();
        if self.adapters.contains_key(&name) {
            return Err(DiffError::DuplicateType(name));
        }
        self.adapters.insert(name, adapter);
        Ok(())
    }

    pub fn get(&self, type_name: &str) -> Option<&DiffAdapter> {
        self.adapters.get(type_name)
    }

    /// Like [`get`](Self::get), but a missing type is an error.
    pub fn lookup(&self, type_name: &str) -> DiffResult<&DiffAdapter> {
        self.get(type_name)
            .ok_or_else(|| DiffError::UnknownType(type_name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiffAdapter> {
        self.adapters.values()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_store::{FeatureValue, InMemoryAnnotationStore, LinkEntry};
    use concord_types::DocumentRef;

    const TEXT: &str = "Alice met Bob in Paris.";

    struct Fixture {
        store: InMemoryAnnotationStore,
        alice: Aid,
        bob: Aid,
        met: Aid,
        rel: Aid,
        meta: Aid,
    }

    fn fixture() -> Fixture {
        let mut store = InMemoryAnnotationStore::new(DocumentRef::new("news", "doc-1"), TEXT);
        let alice = store
            .insert(Annotation::span("Entity", 0, 5).with_feature("value", FeatureValue::text("PER")))
            .unwrap();
        let bob = store
            .insert(Annotation::span("Entity", 10, 13).with_feature("value", FeatureValue::text("PER")))
            .unwrap();
        let met = store
            .insert(Annotation::span("Pred", 6, 9).with_feature(
                "args",
                FeatureValue::Links(vec![LinkEntry::new("agent", alice), LinkEntry::new("theme", bob)]),
            ))
            .unwrap();
        let rel = store.insert(Annotation::relation("Knows", alice, bob)).unwrap();
        let meta = store
            .insert(Annotation::document("Meta").with_feature("genre", FeatureValue::text("news")))
            .unwrap();
        Fixture {
            store,
            alice,
            bob,
            met,
            rel,
            meta,
        }
    }

    fn entity() -> DiffAdapter {
        SpanAdapter::new("Entity").into()
    }

    #[test]
    fn span_selection_requires_full_containment() {
        let f = fixture();
        let window = Window::span(0, 11).unwrap();
        assert_eq!(entity().select_in_window(&f.store, &window).unwrap(), vec![f.alice]);
        let all = entity().select_in_window(&f.store, &Window::Document).unwrap();
        assert_eq!(all, vec![f.alice, f.bob]);
    }

    #[test]
    fn relation_selected_by_target_endpoint() {
        let f = fixture();
        let adapter: DiffAdapter = RelationAdapter::new("Knows").into();
        let around_bob = Window::span(8, 23).unwrap();
        assert_eq!(adapter.select_in_window(&f.store, &around_bob).unwrap(), vec![f.rel]);
        let around_alice = Window::span(0, 6).unwrap();
        assert!(adapter.select_in_window(&f.store, &around_alice).unwrap().is_empty());
    }

    #[test]
    fn document_metadata_ignores_window() {
        let f = fixture();
        let adapter: DiffAdapter = DocumentMetadataAdapter::new("Meta").into();
        let window = Window::span(0, 1).unwrap();
        assert_eq!(adapter.select_in_window(&f.store, &window).unwrap(), vec![f.meta]);
        let ann = f.store.resolve(f.meta).unwrap();
        assert_eq!(
            adapter.position_of(&f.store, f.meta, ann, None).unwrap(),
            Position::document("Meta", "news", "doc-1")
        );
    }

    #[test]
    fn relation_position_uses_endpoint_offsets() {
        let f = fixture();
        let adapter: DiffAdapter = RelationAdapter::new("Knows").into();
        let ann = f.store.resolve(f.rel).unwrap();
        assert_eq!(
            adapter.position_of(&f.store, f.rel, ann, None).unwrap(),
            Position::relation("Knows", (0, 5), (10, 13))
        );
    }

    #[test]
    fn anchor_mismatch_is_reported() {
        let f = fixture();
        let adapter: DiffAdapter = SpanAdapter::new("Knows").into();
        let err = adapter.select_in_window(&f.store, &Window::Document).unwrap_err();
        assert!(matches!(err, DiffError::AnchorMismatch { expected: "span", .. }));
        assert!(err.is_annotator_fault());
    }

    #[test]
    fn link_selectors_resolve_targets() {
        let f = fixture();
        let adapter = LinkRoleAdapter::new("args", LinkCompareMode::TargetAsLabel);
        let ann = f.store.resolve(f.met).unwrap();
        let selectors = adapter.selectors(&f.store, ann).unwrap();
        assert_eq!(selectors.len(), 2);
        assert_eq!(selectors[0].role.as_deref(), Some("agent"));
        assert_eq!(selectors[0].target.as_ref().unwrap().text, "Alice");
        assert_eq!(
            adapter.value_of("Pred", &selectors[0]).unwrap(),
            LabelValues::single("target", ComparableValue::Span { begin: 0, end: 5 })
        );
    }

    #[test]
    fn link_position_keyed_by_mode() {
        let f = fixture();
        let ann = f.store.resolve(f.met).unwrap();

        let by_role: DiffAdapter = SpanAdapter::new("Pred")
            .with_link("args", LinkCompareMode::TargetAsLabel)
            .into();
        let selector = &by_role.link("args").unwrap().selectors(&f.store, ann).unwrap()[0];
        let pos = by_role.position_of(&f.store, f.met, ann, Some(selector)).unwrap();
        assert_eq!(pos.role(), Some("agent"));
        assert!(pos.link_target().is_none());

        let by_target: DiffAdapter = SpanAdapter::new("Pred")
            .with_link("args", LinkCompareMode::RoleAsLabel)
            .into();
        let selector = &by_target.link("args").unwrap().selectors(&f.store, ann).unwrap()[0];
        let pos = by_target.position_of(&f.store, f.met, ann, Some(selector)).unwrap();
        assert_eq!(pos.role(), None);
        assert_eq!(pos.link_target().unwrap().text, "Alice");
        assert_eq!(pos.host(), Some(&Position::span("Pred", 6, 9)));
    }

    #[test]
    fn malformed_link_requests_fail_fast() {
        let f = fixture();
        let ann = f.store.resolve(f.met).unwrap();
        let adapter: DiffAdapter = SpanAdapter::new("Pred")
            .with_link("args", LinkCompareMode::TargetAsLabel)
            .into();

        let no_role = LinkSelector {
            feature: "args".into(),
            mode: LinkCompareMode::TargetAsLabel,
            role: None,
            target: None,
        };
        let err = adapter.position_of(&f.store, f.met, ann, Some(&no_role)).unwrap_err();
        assert!(matches!(err, DiffError::InvalidLinkRequest { .. }));
        assert!(!err.is_annotator_fault());

        let unknown = LinkSelector {
            feature: "other".into(),
            ..no_role.clone()
        };
        assert!(adapter.position_of(&f.store, f.met, ann, Some(&unknown)).is_err());

        let wrong_mode = LinkSelector {
            mode: LinkCompareMode::RoleAsLabel,
            ..no_role
        };
        assert!(adapter.position_of(&f.store, f.met, ann, Some(&wrong_mode)).is_err());
    }

    #[test]
    fn label_values_skip_per_entry_links() {
        let f = fixture();
        let ann = f.store.resolve(f.met).unwrap();
        let features = vec!["args".to_string()];

        let exact: DiffAdapter = SpanAdapter::new("Pred")
            .with_link("args", LinkCompareMode::ExactSet)
            .into();
        let values = exact.label_values(&f.store, ann, &features).unwrap();
        assert!(matches!(values.get("args"), Some(ComparableValue::Links(l)) if l.len() == 2));

        let per_entry: DiffAdapter = SpanAdapter::new("Pred")
            .with_link("args", LinkCompareMode::RoleAsLabel)
            .into();
        assert!(per_entry.label_values(&f.store, ann, &features).unwrap().is_empty());
    }

    #[test]
    fn registry_rejects_duplicates_and_unknown_types() {
        let mut registry = AdapterRegistry::new();
        registry.register(SpanAdapter::new("Entity")).unwrap();
        assert!(matches!(
            registry.register(RelationAdapter::new("Entity")),
            Err(DiffError::DuplicateType(_))
        ));
        assert_eq!(registry.lookup("Entity").unwrap().kind(), "span");
        assert!(matches!(registry.lookup("Nope"), Err(DiffError::UnknownType(_))));
        assert_eq!(registry.len(), 1);
    }
}
