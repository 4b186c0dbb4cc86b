use concord_diff::{Configuration, ConfigurationSet};

use crate::strategy::{MergeContext, MergeStrategy};

/// Never merges; every position is left to the curator.
#[derive(Clone, Copy, Debug, Default)]
pub struct ManualMergeStrategy;

impl MergeStrategy for ManualMergeStrategy {
    fn name(&self) -> &str {
        "manual"
    }

    fn choose_configuration_to_merge<'s>(
        &self,
        _context: &MergeContext,
        _set: &'s ConfigurationSet,
    ) -> Option<&'s Configuration> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testing::set_with_sizes;

    #[test]
    fn never_merges() {
        let set = set_with_sizes(&[4]);
        assert!(ManualMergeStrategy
            .choose_configuration_to_merge(&MergeContext::new(4), &set)
            .is_none());
    }
}
