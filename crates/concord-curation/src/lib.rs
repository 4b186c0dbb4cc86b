//! Curation orchestrator for Concord.
//!
//! Loads every annotator's store for a document, diffs them window by
//! window, classifies each window as agreeing or disputed, and optionally
//! asks a merge strategy which configurations to adopt. Applying those
//! decisions to a curated store is a separate, explicit step.
//!
//! # Key Types
//!
//! - [`Curator`] -- Per-document and batch curation entry point
//! - [`CurationConfig`] -- TOML configuration of layers and strategy
//! - [`StoreProvider`] -- Where annotator stores come from
//! - [`MergePlan`] / [`apply_plan`] -- Merge decisions and writing them out
//! - [`DocumentReport`] / [`BatchReport`] -- What a curation run found

pub mod cancel;
pub mod config;
pub mod curator;
pub mod error;
pub mod plan;
pub mod provider;
pub mod report;

pub use cancel::CancellationFlag;
pub use config::{CurationConfig, LayerConfig, LayerKind, LinkFeatureConfig};
pub use curator::{CurationJob, Curator};
pub use error::{CurationError, CurationResult};
pub use plan::{apply_plan, ApplyReport, MergeDecision, MergePlan, UnappliedItem};
pub use provider::{InMemoryStoreProvider, ProjectFile, StoreProvider};
pub use report::{
    BatchReport, ConfigurationSummary, DocumentReport, FailedUnit, PositionReport, WindowReport,
};

// Re-export the types callers need alongside the curator.
pub use concord_diff::{LinkCompareMode, PositionStatus, WindowStatus};
pub use concord_merge::StrategyConfig;
pub use concord_store::{InMemoryAnnotationStore, CuratedStore};
pub use concord_types::{AnnotatorId, DocumentRef, Window};
