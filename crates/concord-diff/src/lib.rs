//! Multi-annotator diff engine for Concord.
//!
//! Aligns the instances several annotators produced for the same document by
//! structural position, groups equal values into configurations, and
//! classifies each position and window as agreeing or not.
//!
//! # Key Types
//!
//! - [`Position`] -- Structural key deciding which instances are compared
//! - [`DiffAdapter`] / [`AdapterRegistry`] -- Per-type selection and positioning
//! - [`Configuration`] / [`ConfigurationSet`] -- Value-equivalence classes at a position
//! - [`CasDiff`] / [`DiffTarget`] -- The instance collector and its inputs
//! - [`WindowDiff`] -- One window's configuration sets and agreement status

pub mod adapter;
pub mod collector;
pub mod configuration;
pub mod error;
pub mod position;
pub mod result;
pub mod value;

pub use adapter::{
    AdapterRegistry, DiffAdapter, DocumentMetadataAdapter, LinkRoleAdapter, LinkSelector,
    RelationAdapter, SpanAdapter,
};
pub use collector::{CasDiff, DiffTarget};
pub use configuration::{Configuration, ConfigurationSet};
pub use error::{DiffError, DiffResult};
pub use position::{
    DocumentPosition, LinkCompareMode, LinkPosition, LinkTarget, Position, RelationPosition,
    SpanPosition,
};
pub use result::{PositionStatus, SkippedAnnotator, WindowDiff, WindowStatus};
pub use value::{ComparableValue, LabelValues, LinkValue};
