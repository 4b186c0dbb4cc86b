use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use concord_diff::{AdapterRegistry, CasDiff, DiffAdapter, DiffTarget, SkippedAnnotator};
use concord_merge::{ManualMergeStrategy, MergeContext, MergeStrategy};
use concord_store::{AnnotationStore, CuratedStore};
use concord_types::{AnnotatorId, DocumentRef, Window};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::cancel::CancellationFlag;
use crate::config::CurationConfig;
use crate::error::{CurationError, CurationResult};
use crate::plan::{apply_plan, ApplyReport, MergePlan};
use crate::provider::StoreProvider;
use crate::report::{BatchReport, DocumentReport, FailedUnit, WindowReport};

/// One document to curate and the windows to compare it in.
///
/// An empty window list compares the whole document at once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurationJob {
    pub document: DocumentRef,
    pub windows: Vec<Window>,
}

impl CurationJob {
    pub fn whole_document(document: DocumentRef) -> Self {
        Self {
            document,
            windows: Vec::new(),
        }
    }
}

/// Stores loaded for one document.
struct Loaded {
    stores: BTreeMap<AnnotatorId, Arc<dyn AnnotationStore>>,
    unavailable: Vec<SkippedAnnotator>,
}

impl Loaded {
    fn views(&self) -> BTreeMap<AnnotatorId, &dyn AnnotationStore> {
        self.stores
            .iter()
            .map(|(annotator, store)| (annotator.clone(), store.as_ref()))
            .collect()
    }
}

/// Drives diffing and merge planning over documents supplied by a
/// [`StoreProvider`].
///
/// The curator holds no per-document state; one instance can serve many
/// documents concurrently.
pub struct Curator {
    registry: AdapterRegistry,
    targets: Vec<DiffTarget>,
    strategy: Box<dyn MergeStrategy>,
    auto_merge: bool,
    fingerprint: Option<String>,
}

impl Curator {
    pub fn new(
        registry: AdapterRegistry,
        targets: Vec<DiffTarget>,
        strategy: Box<dyn MergeStrategy>,
    ) -> Self {
        Self {
            registry,
            targets,
            strategy,
            auto_merge: false,
            fingerprint: None,
        }
    }

    /// A curator that compares `targets` and never merges.
    pub fn manual(registry: AdapterRegistry, targets: Vec<DiffTarget>) -> Self {
        Self::new(registry, targets, Box::new(ManualMergeStrategy))
    }

    pub fn from_config(config: &CurationConfig) -> CurationResult<Self> {
        config.validate()?;
        Ok(Self {
            registry: config.build_registry()?,
            targets: config.diff_targets(),
            strategy: config.build_strategy()?,
            auto_merge: config.auto_merge,
            fingerprint: Some(config.fingerprint()?),
        })
    }

    pub fn with_auto_merge(mut self, auto_merge: bool) -> Self {
        self.auto_merge = auto_merge;
        self
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn targets(&self) -> &[DiffTarget] {
        &self.targets
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    pub fn auto_merge(&self) -> bool {
        self.auto_merge
    }

    /// Diff one document window by window and, with auto-merge enabled,
    /// plan merges. Nothing is written anywhere.
    pub fn curate_document(
        &self,
        provider: &dyn StoreProvider,
        document: &DocumentRef,
        windows: &[Window],
    ) -> CurationResult<DocumentReport> {
        let loaded = self.load(provider, document)?;
        self.curate_loaded(document, &loaded, windows, self.auto_merge)
    }

    /// Curate one document with merge planning forced on and apply the
    /// decisions to `curated`.
    pub fn merge_document(
        &self,
        provider: &dyn StoreProvider,
        document: &DocumentRef,
        windows: &[Window],
        curated: &mut dyn CuratedStore,
    ) -> CurationResult<(DocumentReport, ApplyReport)> {
        let loaded = self.load(provider, document)?;
        let report = self.curate_loaded(document, &loaded, windows, true)?;

        // One combined plan so relations and links can reach spans curated
        // in any window. Overlapping windows repeat positions; keep the first.
        let mut seen = BTreeSet::new();
        let combined = MergePlan {
            strategy: self.strategy.name().to_string(),
            decisions: report
                .windows
                .iter()
                .filter_map(|w| w.plan.as_ref())
                .flat_map(|plan| plan.decisions.iter())
                .filter(|d| seen.insert(d.position().clone()))
                .cloned()
                .collect(),
        };
        let applied = apply_plan(&combined, &loaded.views(), curated);
        debug!(
            %document,
            applied = applied.applied,
            unapplied = applied.unapplied.len(),
            "merge decisions applied"
        );
        Ok((report, applied))
    }

    /// Curate many documents in parallel.
    ///
    /// Each job checks `cancel` before it starts. Reports of jobs that
    /// completed are kept, in job order, whether or not the batch was
    /// cancelled.
    pub fn curate_batch(
        &self,
        provider: &dyn StoreProvider,
        jobs: &[CurationJob],
        cancel: &CancellationFlag,
    ) -> BatchReport {
        let outcomes: Vec<Option<CurationResult<DocumentReport>>> = jobs
            .par_iter()
            .map(|job| {
                if cancel.is_cancelled() {
                    return None;
                }
                Some(self.curate_document(provider, &job.document, &job.windows))
            })
            .collect();

        let mut report = BatchReport {
            cancelled: cancel.is_cancelled(),
            ..Default::default()
        };
        for (job, outcome) in jobs.iter().zip(outcomes) {
            match outcome {
                None => report.skipped_units += 1,
                Some(Ok(document)) => report.documents.push(document),
                Some(Err(e)) => {
                    warn!(document = %job.document, error = %e, "curation unit failed");
                    report.failed.push(FailedUnit {
                        document: job.document.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            completed = report.documents.len(),
            failed = report.failed.len(),
            skipped = report.skipped_units,
            cancelled = report.cancelled,
            "batch curation complete"
        );
        report
    }

    fn load(&self, provider: &dyn StoreProvider, document: &DocumentRef) -> CurationResult<Loaded> {
        let annotators = provider.annotators(document);
        if annotators.is_empty() {
            return Err(CurationError::DocumentNotFound(document.to_string()));
        }

        let mut loaded = Loaded {
            stores: BTreeMap::new(),
            unavailable: Vec::new(),
        };
        for annotator in annotators {
            match provider.load(&annotator, document) {
                Ok(store) => {
                    loaded.stores.insert(annotator, store);
                }
                Err(e) => {
                    warn!(%annotator, %document, error = %e, "store could not be loaded");
                    loaded.unavailable.push(SkippedAnnotator {
                        annotator,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(loaded)
    }

    fn curate_loaded(
        &self,
        document: &DocumentRef,
        loaded: &Loaded,
        windows: &[Window],
        plan_merges: bool,
    ) -> CurationResult<DocumentReport> {
        let stores = loaded.views();
        let diff = CasDiff::new(&self.registry);

        // Document metadata is compared once per document, never per window.
        let (document_targets, windowed_targets): (Vec<DiffTarget>, Vec<DiffTarget>) =
            self.targets.iter().cloned().partition(|t| {
                matches!(self.registry.get(&t.type_name), Some(DiffAdapter::Document(_)))
            });

        let mut units: Vec<(Window, &[DiffTarget])> = Vec::new();
        if windows.is_empty() {
            units.push((Window::Document, self.targets.as_slice()));
        } else {
            if !windowed_targets.is_empty() {
                units.extend(windows.iter().map(|w| (*w, windowed_targets.as_slice())));
            }
            if !document_targets.is_empty() {
                units.push((Window::Document, document_targets.as_slice()));
            }
        }

        let mut reports = Vec::with_capacity(units.len());
        for (window, targets) in units {
            let window_diff = diff.diff(&window, &stores, targets)?;
            let plan = plan_merges.then(|| {
                let context = MergeContext::new(window_diff.annotator_count())
                    .with_document(document.clone());
                MergePlan::build(&window_diff, self.strategy.as_ref(), &context)
            });
            reports.push(WindowReport::from_diff(&window_diff, plan));
        }

        let report = DocumentReport {
            document: document.clone(),
            annotators: loaded.stores.keys().cloned().collect(),
            unavailable: loaded.unavailable.clone(),
            windows: reports,
            auto_merged: plan_merges,
            config_fingerprint: self.fingerprint.clone(),
        };
        debug!(
            %document,
            windows = report.windows.len(),
            attention = report.attention_count(),
            status = %report.status(),
            "document curated"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for Curator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Curator")
            .field("adapter_count", &self.registry.len())
            .field("target_count", &self.targets.len())
            .field("strategy", &self.strategy.name())
            .field("auto_merge", &self.auto_merge)
            .finish()
    }
}
