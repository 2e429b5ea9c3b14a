// src/engine/result.rs

//! Structured per-step results of a pipeline run.

use crate::engine::bindings::Binding;
use crate::types::{Artifact, ArtifactName, PersistResult};

/// Outcome of one completed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub step_index: usize,
    /// Name the value was bound under; `None` for persist steps without one.
    pub output_name: Option<ArtifactName>,
    pub value: Binding,
}

/// Results of a successful run, ordered by step index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineResult {
    steps: Vec<StepResult>,
}

impl PipelineResult {
    pub(crate) fn from_unordered(mut steps: Vec<StepResult>) -> Self {
        steps.sort_by_key(|s| s.step_index);
        Self { steps }
    }

    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Result of the step that bound `name`.
    pub fn get(&self, name: &str) -> Option<&StepResult> {
        self.steps
            .iter()
            .find(|s| s.output_name.as_deref() == Some(name))
    }

    pub fn artifact(&self, name: &str) -> Option<&Artifact> {
        self.get(name).and_then(|s| s.value.as_artifact())
    }

    /// Every persistence acknowledgement, in step order (named or not).
    pub fn persisted(&self) -> impl Iterator<Item = (usize, &PersistResult)> {
        self.steps
            .iter()
            .filter_map(|s| s.value.as_persisted().map(|p| (s.step_index, p)))
    }
}

impl IntoIterator for PipelineResult {
    type Item = StepResult;
    type IntoIter = std::vec::IntoIter<StepResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}
