//! Annotation store model for Concord.
//!
//! Every annotator works in their own store: an immutable snapshot of the
//! annotations they made on one document. The diff engine only ever reads
//! stores through the [`AnnotationStore`] boundary, and the curation step
//! only ever writes through the [`CuratedStore`] boundary.
//!
//! # Instance Model
//!
//! - [`Annotation`] -- one instance: type name, [`Anchor`], feature values
//! - [`Anchor`] -- span offsets, relation endpoints, or whole document
//! - [`FeatureValue`] / [`LinkEntry`] -- primitive and link-valued features
//!
//! # Storage Backends
//!
//! - [`InMemoryAnnotationStore`] -- `Vec`-based store for tests, fixtures,
//!   and the curated output of a merge
//!
//! # Design Rules
//!
//! 1. A handle ([`concord_types::Aid`]) is only meaningful for the store that
//!    issued it.
//! 2. Stores handed to the diff engine are never mutated while it reads them.
//! 3. Relation endpoints and link targets always resolve to span-anchored
//!    instances of the same store; a store violating that is malformed.

pub mod annotation;
pub mod error;
pub mod memory;
pub mod traits;

pub use annotation::{Anchor, Annotation, FeatureValue, LinkEntry};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryAnnotationStore;
pub use traits::{AnnotationStore, CuratedStore};
