//! Merge plans and the explicit step that applies them.
//!
//! Planning is pure: a [`MergePlan`] records, for every position of a
//! [`WindowDiff`], either the configuration a strategy chose or why the
//! position is left for manual curation. Nothing is written until
//! [`apply_plan`] copies the chosen instances into a [`CuratedStore`].

use std::collections::{BTreeMap, BTreeSet};

use concord_diff::{
    ComparableValue, LabelValues, LinkCompareMode, LinkPosition, Position, PositionStatus,
    WindowDiff,
};
use concord_merge::{MergeContext, MergeStrategy};
use concord_store::{Anchor, Annotation, AnnotationStore, CuratedStore, FeatureValue, LinkEntry};
use concord_types::{Aid, AnnotatorId};
use serde::Serialize;
use tracing::warn;

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// What the strategy decided for one position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum MergeDecision {
    /// Adopt the chosen configuration, copying from one of its annotators.
    Merge {
        position: Position,
        annotator: AnnotatorId,
        aids: Vec<Aid>,
        values: LabelValues,
        votes: usize,
    },
    /// Leave the position for manual curation.
    Unresolved {
        position: Position,
        status: PositionStatus,
    },
}

impl MergeDecision {
    pub fn position(&self) -> &Position {
        match self {
            Self::Merge { position, .. } | Self::Unresolved { position, .. } => position,
        }
    }

    pub fn is_merge(&self) -> bool {
        matches!(self, Self::Merge { .. })
    }
}

/// One decision per position of a window diff, in position order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergePlan {
    pub strategy: String,
    pub decisions: Vec<MergeDecision>,
}

impl MergePlan {
    /// Ask `strategy` about every configuration set in `diff`.
    ///
    /// The chosen configuration is copied from its first annotator in id
    /// order.
    pub fn build(diff: &WindowDiff, strategy: &dyn MergeStrategy, context: &MergeContext) -> Self {
        let decisions = diff
            .sets()
            .iter()
            .map(|(position, set)| {
                let chosen = strategy
                    .choose_configuration_to_merge(context, set)
                    .and_then(|cfg| cfg.entries().next().map(|(a, aids)| (cfg, a, aids)));
                match chosen {
                    Some((cfg, annotator, aids)) => MergeDecision::Merge {
                        position: position.clone(),
                        annotator: annotator.clone(),
                        aids: aids.to_vec(),
                        values: cfg.values().clone(),
                        votes: cfg.size(),
                    },
                    None => MergeDecision::Unresolved {
                        position: position.clone(),
                        status: diff.status_of(set),
                    },
                }
            })
            .collect();
        Self {
            strategy: strategy.name().to_string(),
            decisions,
        }
    }

    pub fn merged(&self) -> impl Iterator<Item = &MergeDecision> {
        self.decisions.iter().filter(|d| d.is_merge())
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &MergeDecision> {
        self.decisions.iter().filter(|d| !d.is_merge())
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Apply
// ---------------------------------------------------------------------------

/// A merge decision that could not be written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UnappliedItem {
    pub position: String,
    pub reason: String,
}

/// Outcome of [`apply_plan`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Instances and link entries written to the curated store.
    pub applied: usize,
    pub unapplied: Vec<UnappliedItem>,
}

impl ApplyReport {
    pub fn merge(&mut self, other: ApplyReport) {
        self.applied += other.applied;
        self.unapplied.extend(other.unapplied);
    }
}

/// Copy every merged instance of `plan` from its annotator's store into
/// `curated`.
///
/// Spans and document metadata are written first, then relations with
/// their endpoints mapped onto curated spans, then link entries. Decisions
/// that cannot be written (e.g. a relation whose endpoint was not curated)
/// are reported and skipped.
pub fn apply_plan(
    plan: &MergePlan,
    stores: &BTreeMap<AnnotatorId, &dyn AnnotationStore>,
    curated: &mut dyn CuratedStore,
) -> ApplyReport {
    let per_entry: BTreeSet<(String, String)> = plan
        .decisions
        .iter()
        .filter_map(|d| match d.position() {
            Position::LinkRole(link) => {
                Some((link.host.type_name().to_string(), link.feature.clone()))
            }
            _ => None,
        })
        .collect();

    let mut applier = Applier {
        stores,
        curated,
        per_entry,
        hosts: BTreeMap::new(),
        pending: Vec::new(),
        report: ApplyReport::default(),
    };

    let merged: Vec<_> = plan.merged().collect();
    for decision in &merged {
        if matches!(decision.position(), Position::Span(_) | Position::Document(_)) {
            applier.run(decision);
        }
    }
    for decision in &merged {
        if matches!(decision.position(), Position::Relation(_)) {
            applier.run(decision);
        }
    }
    applier.copy_pending_links();
    for decision in &merged {
        if decision.position().is_link() {
            applier.run(decision);
        }
    }
    applier.report
}

/// An exact-set link feature to copy once all spans are curated.
struct PendingLinks {
    position: Position,
    host: Aid,
    annotator: AnnotatorId,
    source: Aid,
    feature: String,
}

struct Applier<'a> {
    stores: &'a BTreeMap<AnnotatorId, &'a dyn AnnotationStore>,
    curated: &'a mut dyn CuratedStore,
    per_entry: BTreeSet<(String, String)>,
    hosts: BTreeMap<Position, Vec<Aid>>,
    pending: Vec<PendingLinks>,
    report: ApplyReport,
}

impl<'a> Applier<'a> {
    fn run(&mut self, decision: &MergeDecision) {
        let MergeDecision::Merge {
            position,
            annotator,
            aids,
            values,
            ..
        } = decision
        else {
            return;
        };
        let outcome = match position {
            Position::LinkRole(link) => self.add_entry(link, annotator, aids, values),
            _ => self.copy_instances(position, annotator, aids),
        };
        if let Err(reason) = outcome {
            self.unapplied(position.to_string(), reason);
        }
    }

    fn unapplied(&mut self, position: String, reason: String) {
        warn!(%position, %reason, "merge decision not applied");
        self.report.unapplied.push(UnappliedItem { position, reason });
    }

    fn store(&self, annotator: &AnnotatorId) -> Result<&'a dyn AnnotationStore, String> {
        self.stores
            .get(annotator)
            .copied()
            .ok_or_else(|| format!("store of {annotator} is not available"))
    }

    /// The curated span at the same type and offsets as `aid` in `store`.
    fn counterpart(&self, store: &dyn AnnotationStore, aid: Aid) -> Result<Aid, String> {
        let annotation = store.resolve(aid).map_err(|e| e.to_string())?;
        let (begin, end) = store.span_of(aid).map_err(|e| e.to_string())?;
        self.curated
            .find_span(&annotation.type_name, begin, end)
            .ok_or_else(|| {
                format!(
                    "{}@{begin}..{end} has no curated counterpart",
                    annotation.type_name
                )
            })
    }

    fn copy_instances(
        &mut self,
        position: &Position,
        annotator: &AnnotatorId,
        aids: &[Aid],
    ) -> Result<(), String> {
        let store = self.store(annotator)?;
        for &aid in aids {
            let source = store.resolve(aid).map_err(|e| e.to_string())?;
            let anchor = match source.anchor {
                Anchor::Relation { source: from, target: to } => Anchor::Relation {
                    source: self.counterpart(store, from)?,
                    target: self.counterpart(store, to)?,
                },
                other => other,
            };

            let mut copy = Annotation {
                type_name: source.type_name.clone(),
                anchor,
                features: BTreeMap::new(),
            };
            let mut link_features = Vec::new();
            for (name, value) in &source.features {
                match value {
                    FeatureValue::Links(_) => {
                        let key = (source.type_name.clone(), name.clone());
                        if !self.per_entry.contains(&key) {
                            link_features.push(name.clone());
                        }
                    }
                    other => {
                        copy.features.insert(name.clone(), other.clone());
                    }
                }
            }

            let host = self.curated.add(copy).map_err(|e| e.to_string())?;
            self.hosts.entry(position.clone()).or_default().push(host);
            self.report.applied += 1;
            for feature in link_features {
                self.pending.push(PendingLinks {
                    position: position.clone(),
                    host,
                    annotator: annotator.clone(),
                    source: aid,
                    feature,
                });
            }
        }
        Ok(())
    }

    fn copy_pending_links(&mut self) {
        for pending in std::mem::take(&mut self.pending) {
            if let Err(reason) = self.copy_links(&pending) {
                self.unapplied(format!("{}.{}", pending.position, pending.feature), reason);
            }
        }
    }

    fn copy_links(&mut self, pending: &PendingLinks) -> Result<(), String> {
        let store = self.store(&pending.annotator)?;
        let source = store.resolve(pending.source).map_err(|e| e.to_string())?;
        // Resolve every target first so a missing one leaves the host untouched.
        let remapped = source
            .feature(&pending.feature)
            .links()
            .unwrap_or(&[])
            .iter()
            .map(|entry| Ok(LinkEntry::new(entry.role.clone(), self.counterpart(store, entry.target)?)))
            .collect::<Result<Vec<_>, String>>()?;
        for entry in remapped {
            self.curated
                .add_link(pending.host, &pending.feature, entry)
                .map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    fn add_entry(
        &mut self,
        link: &LinkPosition,
        annotator: &AnnotatorId,
        aids: &[Aid],
        values: &LabelValues,
    ) -> Result<(), String> {
        let host = self
            .hosts
            .get(link.host.as_ref())
            .and_then(|hosts| hosts.first().copied())
            .ok_or_else(|| format!("host {} was not curated", link.host))?;
        let store = self.store(annotator)?;

        for &aid in aids {
            let source = store.resolve(aid).map_err(|e| e.to_string())?;
            for entry in source.feature(&link.feature).links().unwrap_or(&[]) {
                let offsets = store.span_of(entry.target).map_err(|e| e.to_string())?;
                if !entry_matches(link, values, &entry.role, offsets) {
                    continue;
                }
                let target = self.counterpart(store, entry.target)?;
                self.curated
                    .add_link(host, &link.feature, LinkEntry::new(entry.role.clone(), target))
                    .map_err(|e| e.to_string())?;
                self.report.applied += 1;
                return Ok(());
            }
        }
        Err("no matching link entry in the source store".into())
    }
}

/// Whether a source link entry is the one a link position and its merged
/// value describe.
fn entry_matches(
    link: &LinkPosition,
    values: &LabelValues,
    role: &str,
    (begin, end): (usize, usize),
) -> bool {
    match link.mode {
        LinkCompareMode::TargetAsLabel => {
            link.role.as_deref() == Some(role)
                && values.get("target") == Some(&ComparableValue::Span { begin, end })
        }
        LinkCompareMode::RoleAsLabel => {
            link.target
                .as_ref()
                .is_some_and(|t| t.begin == begin && t.end == end)
                && values.get("role") == Some(&ComparableValue::Text(role.to_string()))
        }
        LinkCompareMode::ExactSet => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_diff::{
        AdapterRegistry, CasDiff, DiffTarget, RelationAdapter, SpanAdapter, WindowStatus,
    };
    use concord_merge::{ManualMergeStrategy, MergeIncompleteStrategy, ThresholdBasedMergeStrategy};
    use concord_store::InMemoryAnnotationStore;
    use concord_types::{DocumentRef, Window};

    const TEXT: &str = "Alice met Bob in Paris.";

    fn annotator(name: &str) -> AnnotatorId {
        AnnotatorId::new(name).unwrap()
    }

    fn empty() -> InMemoryAnnotationStore {
        InMemoryAnnotationStore::new(DocumentRef::new("news", "doc-1"), TEXT)
    }

    fn entity(begin: usize, end: usize, value: &str) -> Annotation {
        Annotation::span("Entity", begin, end).with_feature("value", FeatureValue::text(value))
    }

    /// Alice, Bob, a Knows relation, and a predicate linking both.
    fn full_store(bob_value: &str, mode_args: bool) -> InMemoryAnnotationStore {
        let mut s = empty();
        let alice = s.insert(entity(0, 5, "PER")).unwrap();
        let bob = s.insert(entity(10, 13, bob_value)).unwrap();
        s.insert(Annotation::relation("Knows", alice, bob)).unwrap();
        if mode_args {
            s.insert(Annotation::span("Pred", 6, 9).with_feature(
                "args",
                FeatureValue::Links(vec![LinkEntry::new("agent", alice), LinkEntry::new("theme", bob)]),
            ))
            .unwrap();
        }
        s
    }

    fn registry(args_mode: LinkCompareMode) -> AdapterRegistry {
        let mut r = AdapterRegistry::new();
        r.register(SpanAdapter::new("Entity")).unwrap();
        r.register(RelationAdapter::new("Knows")).unwrap();
        r.register(SpanAdapter::new("Pred").with_link("args", args_mode))
            .unwrap();
        r
    }

    fn targets() -> Vec<DiffTarget> {
        vec![
            DiffTarget::new("Entity").with_label("value"),
            DiffTarget::new("Knows"),
            DiffTarget::new("Pred"),
        ]
    }

    fn diff_of(
        registry: &AdapterRegistry,
        stores: &BTreeMap<AnnotatorId, &dyn AnnotationStore>,
    ) -> WindowDiff {
        CasDiff::new(registry)
            .diff(&Window::Document, stores, &targets())
            .unwrap()
    }

    #[test]
    fn manual_strategy_leaves_everything_unresolved() {
        let a = full_store("PER", false);
        let stores: BTreeMap<AnnotatorId, &dyn AnnotationStore> =
            [(annotator("a"), &a as &dyn AnnotationStore)].into_iter().collect();
        let registry = registry(LinkCompareMode::ExactSet);
        let diff = diff_of(&registry, &stores);
        let plan = MergePlan::build(&diff, &ManualMergeStrategy, &MergeContext::new(1));
        assert_eq!(plan.strategy, "manual");
        assert_eq!(plan.merged().count(), 0);
        assert_eq!(plan.unresolved().count(), diff.len());
    }

    #[test]
    fn disputed_position_stays_unresolved_with_status() {
        let a = full_store("PER", false);
        let b = full_store("LOC", false);
        let stores: BTreeMap<AnnotatorId, &dyn AnnotationStore> = [
            (annotator("a"), &a as &dyn AnnotationStore),
            (annotator("b"), &b as &dyn AnnotationStore),
        ]
        .into_iter()
        .collect();
        let registry = registry(LinkCompareMode::ExactSet);
        let diff = diff_of(&registry, &stores);
        assert_eq!(diff.status(), WindowStatus::Disagree);

        let strategy = ThresholdBasedMergeStrategy::new(0, 0.0).unwrap();
        let plan = MergePlan::build(&diff, &strategy, &MergeContext::new(2));
        let unresolved: Vec<_> = plan.unresolved().collect();
        assert_eq!(unresolved.len(), 1);
        assert!(matches!(
            unresolved[0],
            MergeDecision::Unresolved { status: PositionStatus::Disagree, .. }
        ));
    }

    #[test]
    fn apply_copies_spans_then_relations() {
        let a = full_store("PER", false);
        let b = full_store("PER", false);
        let stores: BTreeMap<AnnotatorId, &dyn AnnotationStore> = [
            (annotator("a"), &a as &dyn AnnotationStore),
            (annotator("b"), &b as &dyn AnnotationStore),
        ]
        .into_iter()
        .collect();
        let registry = registry(LinkCompareMode::ExactSet);
        let diff = diff_of(&registry, &stores);
        let plan = MergePlan::build(&diff, &MergeIncompleteStrategy, &MergeContext::new(2));

        let mut curated = empty();
        let report = apply_plan(&plan, &stores, &mut curated);
        assert_eq!(report.applied, 3);
        assert!(report.unapplied.is_empty());

        let rel = curated.select("Knows").unwrap()[0];
        let Anchor::Relation { source, target } = curated.resolve(rel).unwrap().anchor else {
            panic!("expected relation");
        };
        assert_eq!(curated.span_of(source).unwrap(), (0, 5));
        assert_eq!(curated.span_of(target).unwrap(), (10, 13));
    }

    #[test]
    fn relation_without_curated_endpoint_is_reported() {
        let a = full_store("PER", false);
        let b = full_store("LOC", false);
        let stores: BTreeMap<AnnotatorId, &dyn AnnotationStore> = [
            (annotator("a"), &a as &dyn AnnotationStore),
            (annotator("b"), &b as &dyn AnnotationStore),
        ]
        .into_iter()
        .collect();
        let registry = registry(LinkCompareMode::ExactSet);
        let diff = diff_of(&registry, &stores);
        let plan = MergePlan::build(&diff, &MergeIncompleteStrategy, &MergeContext::new(2));

        let mut curated = empty();
        let report = apply_plan(&plan, &stores, &mut curated);
        // Alice is curated, Bob is disputed, so the relation cannot be.
        assert_eq!(report.applied, 1);
        assert_eq!(report.unapplied.len(), 1);
        assert!(report.unapplied[0].position.starts_with("Knows@"));
        assert!(curated.select("Knows").unwrap().is_empty());
    }

    #[test]
    fn exact_set_links_are_remapped() {
        let a = full_store("PER", true);
        let stores: BTreeMap<AnnotatorId, &dyn AnnotationStore> =
            [(annotator("a"), &a as &dyn AnnotationStore)].into_iter().collect();
        let registry = registry(LinkCompareMode::ExactSet);
        let diff = diff_of(&registry, &stores);
        let plan = MergePlan::build(&diff, &MergeIncompleteStrategy, &MergeContext::new(1));

        let mut curated = empty();
        let report = apply_plan(&plan, &stores, &mut curated);
        assert!(report.unapplied.is_empty());

        let pred = curated.select("Pred").unwrap()[0];
        let links = curated.resolve(pred).unwrap().feature("args").links().unwrap().to_vec();
        assert_eq!(links.len(), 2);
        assert_eq!(curated.span_of(links[1].target).unwrap(), (10, 13));
    }

    #[test]
    fn exact_set_links_are_all_or_nothing() {
        let a = full_store("PER", true);
        let b = full_store("LOC", true);
        let stores: BTreeMap<AnnotatorId, &dyn AnnotationStore> = [
            (annotator("a"), &a as &dyn AnnotationStore),
            (annotator("b"), &b as &dyn AnnotationStore),
        ]
        .into_iter()
        .collect();
        let registry = registry(LinkCompareMode::ExactSet);
        let diff = diff_of(&registry, &stores);
        let plan = MergePlan::build(&diff, &MergeIncompleteStrategy, &MergeContext::new(2));

        let mut curated = empty();
        let report = apply_plan(&plan, &stores, &mut curated);
        // Bob is disputed, so neither the relation nor the predicate's links land.
        let args: Vec<_> = report
            .unapplied
            .iter()
            .filter(|item| item.position.starts_with("Pred@"))
            .collect();
        assert_eq!(args.len(), 1);

        let pred = curated.select("Pred").unwrap()[0];
        let links = curated.resolve(pred).unwrap().feature("args").links();
        assert!(links.map_or(true, |l| l.is_empty()));
    }

    #[test]
    fn per_entry_links_follow_their_own_decisions() {
        let a = full_store("PER", true);
        let mut b = empty();
        let alice = b.insert(entity(0, 5, "PER")).unwrap();
        let bob = b.insert(entity(10, 13, "PER")).unwrap();
        b.insert(Annotation::relation("Knows", alice, bob)).unwrap();
        // b agrees on the agent but names Alice as theme too
        b.insert(Annotation::span("Pred", 6, 9).with_feature(
            "args",
            FeatureValue::Links(vec![LinkEntry::new("agent", alice), LinkEntry::new("theme", alice)]),
        ))
        .unwrap();

        let stores: BTreeMap<AnnotatorId, &dyn AnnotationStore> = [
            (annotator("a"), &a as &dyn AnnotationStore),
            (annotator("b"), &b as &dyn AnnotationStore),
        ]
        .into_iter()
        .collect();
        let registry = registry(LinkCompareMode::TargetAsLabel);
        let diff = diff_of(&registry, &stores);
        let plan = MergePlan::build(&diff, &MergeIncompleteStrategy, &MergeContext::new(2));

        let mut curated = empty();
        let report = apply_plan(&plan, &stores, &mut curated);
        assert!(report.unapplied.is_empty());

        let pred = curated.select("Pred").unwrap()[0];
        let links = curated.resolve(pred).unwrap().feature("args").links().unwrap().to_vec();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].role, "agent");
        assert_eq!(curated.span_of(links[0].target).unwrap(), (0, 5));
    }
}
