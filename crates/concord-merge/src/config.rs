use serde::{Deserialize, Serialize};

use crate::error::MergeResult;
use crate::strategies::{
    CompleteAgreementStrategy, ManualMergeStrategy, MergeIncompleteStrategy,
    ThresholdBasedMergeStrategy,
};
use crate::strategy::MergeStrategy;

/// Serializable choice of merge strategy.
///
/// The default leaves every position for manual curation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    Threshold {
        #[serde(default)]
        min_annotators: usize,
        min_confidence: f64,
    },
    CompleteAgreement,
    MergeIncomplete,
    #[default]
    Manual,
}

impl StrategyConfig {
    /// Check the parameters without building the strategy.
    pub fn validate(&self) -> MergeResult<()> {
        self.build().map(|_| ())
    }

    /// Build the configured strategy, rejecting invalid thresholds.
    pub fn build(&self) -> MergeResult<Box<dyn MergeStrategy>> {
        Ok(match self {
            Self::Threshold {
                min_annotators,
                min_confidence,
            } => Box::new(ThresholdBasedMergeStrategy::new(
                *min_annotators,
                *min_confidence,
            )?),
            Self::CompleteAgreement => Box::new(CompleteAgreementStrategy),
            Self::MergeIncomplete => Box::new(MergeIncompleteStrategy),
            Self::Manual => Box::new(ManualMergeStrategy),
        })
    }
}
