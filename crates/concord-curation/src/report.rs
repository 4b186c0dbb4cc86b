use concord_diff::{
    ConfigurationSet, LabelValues, Position, PositionStatus, SkippedAnnotator, WindowDiff,
    WindowStatus,
};
use concord_types::{AnnotatorId, DocumentRef, Window};
use serde::Serialize;

use crate::plan::MergePlan;

/// One value observed at a position and who chose it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConfigurationSummary {
    pub values: LabelValues,
    pub annotators: Vec<AnnotatorId>,
}

/// A position that is not in full agreement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PositionReport {
    pub position: Position,
    pub status: PositionStatus,
    pub configurations: Vec<ConfigurationSummary>,
}

impl PositionReport {
    fn new(set: &ConfigurationSet, status: PositionStatus) -> Self {
        Self {
            position: set.position().clone(),
            status,
            configurations: set
                .configurations()
                .iter()
                .map(|cfg| ConfigurationSummary {
                    values: cfg.values().clone(),
                    annotators: cfg.annotators().cloned().collect(),
                })
                .collect(),
        }
    }
}

/// Curation outcome for one window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WindowReport {
    pub window: Window,
    pub status: WindowStatus,
    /// Number of positions compared.
    pub positions: usize,
    /// Positions needing a curator's attention.
    pub attention: Vec<PositionReport>,
    /// Annotators left out of this window's diff.
    pub skipped: Vec<SkippedAnnotator>,
    /// Present when auto-merge ran.
    pub plan: Option<MergePlan>,
}

impl WindowReport {
    pub fn from_diff(diff: &WindowDiff, plan: Option<MergePlan>) -> Self {
        Self {
            window: *diff.window(),
            status: diff.status(),
            positions: diff.len(),
            attention: diff
                .attention()
                .map(|(set, status)| PositionReport::new(set, status))
                .collect(),
            skipped: diff.skipped().to_vec(),
            plan,
        }
    }
}

/// Curation outcome for one document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    pub document: DocumentRef,
    /// Annotators whose stores were loaded.
    pub annotators: Vec<AnnotatorId>,
    /// Annotators whose stores could not be loaded.
    pub unavailable: Vec<SkippedAnnotator>,
    pub windows: Vec<WindowReport>,
    pub auto_merged: bool,
    /// Fingerprint of the configuration that produced the report.
    pub config_fingerprint: Option<String>,
}

impl DocumentReport {
    /// AGREE only if every window agrees.
    pub fn status(&self) -> WindowStatus {
        if self.windows.iter().all(|w| w.status == WindowStatus::Agree) {
            WindowStatus::Agree
        } else {
            WindowStatus::Disagree
        }
    }

    /// Total positions needing attention across windows.
    pub fn attention_count(&self) -> usize {
        self.windows.iter().map(|w| w.attention.len()).sum()
    }
}

/// A batch unit that failed outright.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailedUnit {
    pub document: DocumentRef,
    pub error: String,
}

/// Outcome of a batch run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Reports of completed units, in job order.
    pub documents: Vec<DocumentReport>,
    pub failed: Vec<FailedUnit>,
    pub cancelled: bool,
    /// Units never started because the batch was cancelled.
    pub skipped_units: usize,
}
