use concord_diff::{Configuration, ConfigurationSet};

use crate::strategy::{MergeContext, MergeStrategy};

/// Merges only unanimous positions: exactly one configuration, backed by
/// every annotator compared.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompleteAgreementStrategy;

impl MergeStrategy for CompleteAgreementStrategy {
    fn name(&self) -> &str {
        "complete_agreement"
    }

    fn choose_configuration_to_merge<'s>(
        &self,
        context: &MergeContext,
        set: &'s ConfigurationSet,
    ) -> Option<&'s Configuration> {
        match set.configurations() {
            [only] if only.size() >= context.annotator_count => Some(only),
            _ => None,
        }
    }
}

/// Merges any position with exactly one configuration, even if some
/// annotators did not contribute there.
#[derive(Clone, Copy, Debug, Default)]
pub struct MergeIncompleteStrategy;

impl MergeStrategy for MergeIncompleteStrategy {
    fn name(&self) -> &str {
        "merge_incomplete"
    }

    fn choose_configuration_to_merge<'s>(
        &self,
        _context: &MergeContext,
        set: &'s ConfigurationSet,
    ) -> Option<&'s Configuration> {
        match set.configurations() {
            [only] => Some(only),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testing::set_with_sizes;

    #[test]
    fn complete_agreement_requires_full_coverage() {
        let set = set_with_sizes(&[3]);
        assert!(CompleteAgreementStrategy
            .choose_configuration_to_merge(&MergeContext::new(3), &set)
            .is_some());
        assert!(CompleteAgreementStrategy
            .choose_configuration_to_merge(&MergeContext::new(4), &set)
            .is_none());
    }

    #[test]
    fn complete_agreement_rejects_disagreement() {
        let set = set_with_sizes(&[2, 1]);
        assert!(CompleteAgreementStrategy
            .choose_configuration_to_merge(&MergeContext::new(3), &set)
            .is_none());
    }

    #[test]
    fn merge_incomplete_ignores_coverage() {
        let ctx = MergeContext::new(5);
        assert!(MergeIncompleteStrategy
            .choose_configuration_to_merge(&ctx, &set_with_sizes(&[1]))
            .is_some());
        assert!(MergeIncompleteStrategy
            .choose_configuration_to_merge(&ctx, &set_with_sizes(&[1, 1]))
            .is_none());
        assert!(MergeIncompleteStrategy
            .choose_configuration_to_merge(&ctx, &set_with_sizes(&[]))
            .is_none());
    }
}
