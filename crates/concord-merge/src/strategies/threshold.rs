use concord_diff::{Configuration, ConfigurationSet};

use crate::error::{MergeError, MergeResult};
use crate::strategy::{MergeContext, MergeStrategy};

/// Merges the most-voted configuration when it has enough votes and a clear
/// enough lead over the runner-up.
///
/// With `best` and `second` the two largest configuration sizes (`second`
/// is 0 when there is only one configuration), `best` is merged iff
///
/// - `best != second` (ties are never broken),
/// - `best >= min_annotators`, and
/// - `(best - second) / best >= min_confidence`.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdBasedMergeStrategy {
    min_annotators: usize,
    min_confidence: f64,
}

impl ThresholdBasedMergeStrategy {
    /// Build the strategy. `min_confidence` must be a number in `[0, 1]`.
    pub fn new(min_annotators: usize, min_confidence: f64) -> MergeResult<Self> {
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(MergeError::InvalidConfidence(min_confidence));
        }
        Ok(Self {
            min_annotators,
            min_confidence,
        })
    }

    pub fn min_annotators(&self) -> usize {
        self.min_annotators
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }
}

impl MergeStrategy for ThresholdBasedMergeStrategy {
    fn name(&self) -> &str {
        "threshold"
    }

    fn choose_configuration_to_merge<'s>(
        &self,
        _context: &MergeContext,
        set: &'s ConfigurationSet,
    ) -> Option<&'s Configuration> {
        let mut ranked: Vec<&Configuration> = set.configurations().iter().collect();
        // stable: among equal sizes the first observed value ranks first
        ranked.sort_by(|a, b| b.size().cmp(&a.size()));

        let best = *ranked.first()?;
        let best_size = best.size();
        let second_size = ranked.get(1).map_or(0, |c| c.size());

        if best_size == second_size || best_size < self.min_annotators {
            return None;
        }
        let confidence = (best_size - second_size) as f64 / best_size as f64;
        (confidence >= self.min_confidence).then_some(best)
    }
}
