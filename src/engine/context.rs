// src/engine/context.rs

//! Per-run state: phase, binding table and completed step results.

use tracing::{debug, info, warn};

use crate::engine::bindings::{Binding, BindingTable};
use crate::engine::result::{PipelineResult, StepResult};
use crate::errors::{PipelineError, Result};
use crate::types::{Artifact, ArtifactName};

/// Lifecycle of a single pipeline run.
///
/// `Idle -> Built -> Scheduled -> Executing { wave: 0.. } -> Completed`, with
/// `Failed` reachable from every non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Context created, nothing done yet.
    Idle,
    /// Dependency graph built.
    Built,
    /// Waves computed.
    Scheduled,
    /// Wave `wave` is executing.
    Executing { wave: usize },
    Failed,
    Completed,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Failed | RunPhase::Completed)
    }
}

/// State owned by exactly one pipeline run.
///
/// Passed explicitly through the runner so that concurrent runs never share
/// a table. After a failed run the caller can still inspect which artifacts
/// were bound.
#[derive(Debug)]
pub struct RunContext {
    phase: RunPhase,
    bindings: BindingTable,
    results: Vec<StepResult>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            phase: RunPhase::Idle,
            bindings: BindingTable::new(),
            results: Vec::new(),
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    /// Results of steps completed so far, in completion-wave order.
    pub fn completed_steps(&self) -> &[StepResult] {
        &self.results
    }

    pub(crate) fn ensure_idle(&self) -> Result<()> {
        if self.phase != RunPhase::Idle {
            return Err(PipelineError::ConfigError(format!(
                "run context already used (phase {:?}); create a new one per run",
                self.phase
            )));
        }
        Ok(())
    }

    pub(crate) fn transition(&mut self, next: RunPhase) {
        match next {
            RunPhase::Failed => warn!(from = ?self.phase, "pipeline run failed"),
            RunPhase::Completed => info!(
                bound = self.bindings.len(),
                steps = self.results.len(),
                "pipeline run completed"
            ),
            _ => debug!(from = ?self.phase, to = ?next, "pipeline run phase change"),
        }
        self.phase = next;
    }

    /// Resolve a step's input as an artifact.
    pub(crate) fn resolve_artifact(&self, step_index: usize, name: &str) -> Result<Artifact> {
        match self.bindings.get(name) {
            Some(Binding::Artifact(artifact)) => Ok(artifact.clone()),
            Some(Binding::Persisted(_)) => Err(PipelineError::NotAnArtifact {
                step_index,
                name: name.to_string(),
            }),
            None => Err(PipelineError::UnresolvedBinding {
                step_index,
                name: name.to_string(),
                produced: self.bindings.names(),
            }),
        }
    }

    /// Record a completed step and bind its output, if it declares one.
    pub(crate) fn record(&mut self, step_index: usize, output_name: Option<ArtifactName>, value: Binding) {
        if let Some(name) = &output_name {
            if !self.bindings.insert(name.clone(), value.clone()) {
                warn!(step = step_index, output = %name, "name already bound; keeping first value");
            }
        }
        self.results.push(StepResult {
            step_index,
            output_name,
            value,
        });
    }

    pub(crate) fn result(&self) -> PipelineResult {
        PipelineResult::from_unordered(self.results.clone())
    }
}
