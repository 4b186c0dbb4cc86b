//! Merge strategies for Concord.
//!
//! Given the configuration set found at one position, a [`MergeStrategy`]
//! decides which configuration (if any) should be adopted into the curated
//! result. Strategies are pure: they read a configuration set and return a
//! reference into it, never mutating anything.
//!
//! # Key Types
//!
//! - [`MergeStrategy`] -- The strategy trait
//! - [`MergeContext`] -- What a strategy knows about the unit of work
//! - [`ThresholdBasedMergeStrategy`] -- Vote-count and confidence thresholds
//! - [`StrategyConfig`] -- Serializable strategy selection

pub mod config;
pub mod error;
pub mod strategies;
pub mod strategy;

pub use config::StrategyConfig;
pub use error::{MergeError, MergeResult};
pub use strategies::{
    CompleteAgreementStrategy, ManualMergeStrategy, MergeIncompleteStrategy,
    ThresholdBasedMergeStrategy,
};
pub use strategy::{MergeContext, MergeStrategy};
