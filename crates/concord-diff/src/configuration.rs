//! Value-equivalence classes at one position.

use std::collections::{BTreeMap, BTreeSet};

use concord_types::{Aid, AnnotatorId};
use serde::Serialize;

use crate::error::{DiffError, DiffResult};
use crate::position::Position;
use crate::value::LabelValues;

/// The annotators who agree on one value at one position, with the handles
/// of their instances.
///
/// An annotator appears at most once unless the configuration was created
/// with stacking enabled, in which case it may hold several handles for
/// the same annotator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Configuration {
    position: Position,
    values: LabelValues,
    stacking: bool,
    aids: BTreeMap<AnnotatorId, Vec<Aid>>,
}

impl Configuration {
    pub fn new(position: Position, values: LabelValues, stacking: bool) -> Self {
        Self {
            position,
            values,
            stacking,
            aids: BTreeMap::new(),
        }
    }

    /// Record an annotator's instance in this configuration.
    pub fn add(&mut self, annotator: AnnotatorId, aid: Aid) -> DiffResult<()> {
        if !self.stacking && self.aids.contains_key(&annotator) {
            return Err(DiffError::DuplicateAnnotator {
                annotator,
                position: self.position.to_string(),
            });
        }
        self.aids.entry(annotator).or_default().push(aid);
        Ok(())
    }

    /// Number of distinct annotators (votes) backing this value.
    pub fn size(&self) -> usize {
        self.aids.len()
    }

    pub fn annotators(&self) -> impl Iterator<Item = &AnnotatorId> {
        self.aids.keys()
    }

    pub fn contains(&self, annotator: &AnnotatorId) -> bool {
        self.aids.contains_key(annotator)
    }

    /// Every handle the annotator contributed here. Empty if absent.
    pub fn aids(&self, annotator: &AnnotatorId) -> &[Aid] {
        self.aids.get(annotator).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The annotator's first handle, if present.
    pub fn aid(&self, annotator: &AnnotatorId) -> Option<Aid> {
        self.aids(annotator).first().copied()
    }

    /// `(annotator, handles)` pairs in annotator order.
    pub fn entries(&self) -> impl Iterator<Item = (&AnnotatorId, &[Aid])> {
        self.aids.iter().map(|(a, aids)| (a, aids.as_slice()))
    }

    pub fn values(&self) -> &LabelValues {
        &self.values
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn allows_stacking(&self) -> bool {
        self.stacking
    }
}

/// All configurations observed at one position, in the order their values
/// were first seen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConfigurationSet {
    position: Position,
    configurations: Vec<Configuration>,
}

impl ConfigurationSet {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            configurations: Vec::new(),
        }
    }

    /// Append a configuration built for this set's position.
    pub fn add_configuration(&mut self, configuration: Configuration) -> DiffResult<()> {
        if configuration.position != self.position {
            return Err(DiffError::PositionMismatch {
                expected: self.position.to_string(),
                found: configuration.position.to_string(),
            });
        }
        self.configurations.push(configuration);
        Ok(())
    }

    pub fn configurations(&self) -> &[Configuration] {
        &self.configurations
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Number of distinct values observed.
    pub fn size(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    /// Annotators who contributed anything at this position.
    pub fn annotators(&self) -> BTreeSet<&AnnotatorId> {
        self.configurations
            .iter()
            .flat_map(Configuration::annotators)
            .collect()
    }

    /// Number of distinct annotators who contributed here (coverage).
    pub fn annotator_count(&self) -> usize {
        self.annotators().len()
    }

    /// Sum of every configuration's size.
    pub fn total_votes(&self) -> usize {
        self.configurations.iter().map(Configuration::size).sum()
    }

    /// At least two distinct values were observed.
    pub fn is_disagreement(&self) -> bool {
        self.configurations.len() > 1
    }

    /// The configuration holding exactly these values.
    pub fn find(&self, values: &LabelValues) -> Option<&Configuration> {
        self.configurations.iter().find(|c| &c.values == values)
    }

    /// The configuration the annotator belongs to, if any.
    pub fn configuration_of(&self, annotator: &AnnotatorId) -> Option<&Configuration> {
        self.configurations.iter().find(|c| c.contains(annotator))
    }

    /// Join the configuration with equal values, or start a new one.
    ///
    /// Without stacking an annotator may appear only once in the whole set,
    /// whichever value it contributed.
    pub(crate) fn record(
        &mut self,
        annotator: &AnnotatorId,
        aid: Aid,
        values: LabelValues,
        stacking: bool,
    ) -> DiffResult<()> {
        if !stacking && self.configuration_of(annotator).is_some() {
            return Err(DiffError::DuplicateAnnotator {
                annotator: annotator.clone(),
                position: self.position.to_string(),
            });
        }
        if let Some(existing) = self.configurations.iter_mut().find(|c| c.values == values) {
            return existing.add(annotator.clone(), aid);
        }
        let mut configuration = Configuration::new(self.position.clone(), values, stacking);
        configuration.add(annotator.clone(), aid)?;
        self.configurations.push(configuration);
        Ok(())
    }
}
