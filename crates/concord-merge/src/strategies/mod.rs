//! Built-in merge strategies.

pub mod agreement;
pub mod manual;
pub mod threshold;

pub use agreement::{CompleteAgreementStrategy, MergeIncompleteStrategy};
pub use manual::ManualMergeStrategy;
pub use threshold::ThresholdBasedMergeStrategy;
