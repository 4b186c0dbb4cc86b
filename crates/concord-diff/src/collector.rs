//! The instance collector: aligns every annotator's instances by position
//! and groups them into configuration sets.

use std::collections::{BTreeMap, BTreeSet};

use concord_store::AnnotationStore;
use concord_types::{Aid, AnnotatorId, Window};
use tracing::{debug, warn};

use crate::adapter::{AdapterRegistry, DiffAdapter};
use crate::configuration::ConfigurationSet;
use crate::error::{DiffError, DiffResult};
use crate::position::Position;
use crate::result::{SkippedAnnotator, WindowDiff};
use crate::value::LabelValues;

/// One annotation type to compare and the features that decide agreement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffTarget {
    pub type_name: String,
    pub label_features: BTreeSet<String>,
    pub allow_stacking: bool,
}

impl DiffTarget {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            label_features: BTreeSet::new(),
            allow_stacking: false,
        }
    }

    pub fn with_label(mut self, feature: impl Into<String>) -> Self {
        self.label_features.insert(feature.into());
        self
    }

    pub fn with_stacking(mut self, allow: bool) -> Self {
        self.allow_stacking = allow;
        self
    }
}

/// A contribution waiting to be committed.
struct Staged {
    position: Position,
    aid: Aid,
    values: LabelValues,
    stacking: bool,
}

/// Multi-annotator diff over one window.
///
/// The collector only reads stores. Each call builds a fresh [`WindowDiff`];
/// running it twice over the same input yields equal results.
#[derive(Clone, Copy, Debug)]
pub struct CasDiff<'r> {
    registry: &'r AdapterRegistry,
}

impl<'r> CasDiff<'r> {
    pub fn new(registry: &'r AdapterRegistry) -> Self {
        Self { registry }
    }

    /// Compare the stores' instances of every target type inside `window`.
    ///
    /// Annotators are visited in id order. An annotator whose store cannot be
    /// read consistently is skipped and recorded; configuration errors
    /// (unknown type, duplicate target, malformed link request) fail the
    /// whole call.
    pub fn diff(
        &self,
        window: &Window,
        stores: &BTreeMap<AnnotatorId, &dyn AnnotationStore>,
        targets: &[DiffTarget],
    ) -> DiffResult<WindowDiff> {
        let resolved = self.resolve_targets(targets)?;

        let mut sets: BTreeMap<Position, ConfigurationSet> = BTreeMap::new();
        let mut annotators = BTreeSet::new();
        let mut skipped = Vec::new();

        for (annotator, store) in stores {
            let staged = match stage(window, annotator, *store, &resolved) {
                Ok(staged) => staged,
                Err(e) if e.is_annotator_fault() => {
                    warn!(annotator = %annotator, %window, error = %e, "skipping annotator");
                    skipped.push(SkippedAnnotator {
                        annotator: annotator.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            for item in staged {
                sets.entry(item.position.clone())
                    .or_insert_with(|| ConfigurationSet::new(item.position))
                    .record(annotator, item.aid, item.values, item.stacking)?;
            }
            annotators.insert(annotator.clone());
        }

        debug!(
            %window,
            annotators = annotators.len(),
            skipped = skipped.len(),
            positions = sets.len(),
            disagreements = sets.values().filter(|s| s.is_disagreement()).count(),
            "window diff complete"
        );

        Ok(WindowDiff {
            window: *window,
            annotators,
            skipped,
            sets,
        })
    }

    fn resolve_targets<'t>(
        &self,
        targets: &'t [DiffTarget],
    ) -> DiffResult<Vec<(&'t DiffTarget, &'r DiffAdapter)>> {
        let mut seen = BTreeSet::new();
        targets
            .iter()
            .map(|target| {
                if !seen.insert(target.type_name.as_str()) {
                    return Err(DiffError::DuplicateTarget(target.type_name.clone()));
                }
                Ok((target, self.registry.lookup(&target.type_name)?))
            })
            .collect()
    }
}

/// Gather one annotator's contributions to every target without touching
/// the shared sets, so a failure leaves nothing behind.
fn stage(
    window: &Window,
    annotator: &AnnotatorId,
    store: &dyn AnnotationStore,
    targets: &[(&DiffTarget, &DiffAdapter)],
) -> DiffResult<Vec<Staged>> {
    let mut staged = Vec::new();
    let mut occupied: BTreeSet<Position> = BTreeSet::new();

    for (target, adapter) in targets {
        for aid in adapter.select_in_window(store, window)? {
            let annotation = store.resolve(aid)?;
            let position = adapter.position_of(store, aid, annotation, None)?;

            if !target.allow_stacking && !occupied.insert(position.clone()) {
                return Err(DiffError::DuplicateAnnotator {
                    annotator: annotator.clone(),
                    position: position.to_string(),
                });
            }

            for link in adapter.per_entry_links() {
                for selector in link.selectors(store, annotation)? {
                    let sub = adapter.position_of(store, aid, annotation, Some(&selector))?;
                    if !target.allow_stacking && !occupied.insert(sub.clone()) {
                        return Err(DiffError::DuplicateAnnotator {
                            annotator: annotator.clone(),
                            position: sub.to_string(),
                        });
                    }
                    staged.push(Staged {
                        position: sub,
                        aid,
                        values: link.value_of(adapter.type_name(), &selector)?,
                        stacking: target.allow_stacking,
                    });
                }
            }

            staged.push(Staged {
                values: adapter.label_values(store, annotation, &target.label_features)?,
                position,
                aid,
                stacking: target.allow_stacking,
            });
        }
    }
    Ok(staged)
}
