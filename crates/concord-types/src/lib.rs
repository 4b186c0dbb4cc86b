//! Foundation types for Concord.
//!
//! This crate provides the identity and addressing types shared by every
//! other Concord crate: who annotated (annotator), which instance inside one
//! annotator's store (handle), which document, and which part of it is being
//! compared (window).
//!
//! # Key Types
//!
//! - [`AnnotatorId`] -- Identity of one annotator whose work is compared
//! - [`Aid`] -- Opaque, store-local handle of one annotation instance
//! - [`DocumentRef`] -- Collection/document pair a store annotates
//! - [`Window`] -- Span of text (or the whole document) under comparison

pub mod error;
pub mod identity;
pub mod window;

pub use error::TypeError;
pub use identity::{Aid, AnnotatorId, DocumentRef};
pub use window::Window;
