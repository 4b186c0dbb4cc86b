//! The outcome of one diff call and its agreement classification.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use concord_types::{Aid, AnnotatorId, Window};
use serde::{Deserialize, Serialize};

use crate::configuration::ConfigurationSet;
use crate::position::Position;

/// Agreement state of a single position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    /// One value, and every annotator queried contributed it.
    Agree,
    /// One value, but some annotator contributed nothing here.
    Incomplete,
    /// At least two distinct values.
    Disagree,
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agree => write!(f, "agree"),
            Self::Incomplete => write!(f, "incomplete"),
            Self::Disagree => write!(f, "disagree"),
        }
    }
}

/// Agreement state of a whole window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStatus {
    Agree,
    Disagree,
}

impl fmt::Display for WindowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agree => write!(f, "AGREE"),
            Self::Disagree => write!(f, "DISAGREE"),
        }
    }
}

/// An annotator left out of a diff because its store could not be read
/// consistently.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedAnnotator {
    pub annotator: AnnotatorId,
    pub reason: String,
}

/// Every configuration set found in one window, keyed by position.
///
/// Immutable once built by the collector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowDiff {
    pub(crate) window: Window,
    pub(crate) annotators: BTreeSet<AnnotatorId>,
    pub(crate) skipped: Vec<SkippedAnnotator>,
    pub(crate) sets: BTreeMap<Position, ConfigurationSet>,
}

impl WindowDiff {
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Annotators whose contributions are part of this diff.
    pub fn annotators(&self) -> &BTreeSet<AnnotatorId> {
        &self.annotators
    }

    /// Number of annotators compared (skipped ones excluded).
    pub fn annotator_count(&self) -> usize {
        self.annotators.len()
    }

    pub fn skipped(&self) -> &[SkippedAnnotator] {
        &self.skipped
    }

    pub fn sets(&self) -> &BTreeMap<Position, ConfigurationSet> {
        &self.sets
    }

    pub fn get(&self, position: &Position) -> Option<&ConfigurationSet> {
        self.sets.get(position)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Classify one configuration set against the annotators compared.
    pub fn status_of(&self, set: &ConfigurationSet) -> PositionStatus {
        if set.is_disagreement() {
            PositionStatus::Disagree
        } else if set.annotator_count() < self.annotators.len() {
            PositionStatus::Incomplete
        } else {
            PositionStatus::Agree
        }
    }

    /// AGREE only if every position agrees. An empty window agrees.
    pub fn status(&self) -> WindowStatus {
        if self.is_agreement() {
            WindowStatus::Agree
        } else {
            WindowStatus::Disagree
        }
    }

    pub fn is_agreement(&self) -> bool {
        self.sets
            .values()
            .all(|set| self.status_of(set) == PositionStatus::Agree)
    }

    /// Positions with at least two distinct values.
    pub fn disagreements(&self) -> impl Iterator<Item = &ConfigurationSet> {
        self.sets.values().filter(|set| set.is_disagreement())
    }

    /// Positions with a single value some annotator did not contribute.
    pub fn incomplete(&self) -> impl Iterator<Item = &ConfigurationSet> {
        self.sets
            .values()
            .filter(|set| self.status_of(set) == PositionStatus::Incomplete)
    }

    /// Positions that are not in full agreement, with their status.
    pub fn attention(&self) -> impl Iterator<Item = (&ConfigurationSet, PositionStatus)> {
        self.sets
            .values()
            .map(|set| (set, self.status_of(set)))
            .filter(|(_, status)| *status != PositionStatus::Agree)
    }

    /// Coarse per-type view of every instance involved in a disagreement.
    pub fn conflicting_instances(&self) -> BTreeMap<String, BTreeSet<(AnnotatorId, Aid)>> {
        let mut out: BTreeMap<String, BTreeSet<(AnnotatorId, Aid)>> = BTreeMap::new();
        for set in self.disagreements() {
            let entry = out.entry(set.position().type_name().to_string()).or_default();
            for configuration in set.configurations() {
                for (annotator, aids) in configuration.entries() {
                    entry.extend(aids.iter().map(|aid| (annotator.clone(), *aid)));
                }
            }
        }
        out
    }
}
