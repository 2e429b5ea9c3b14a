// src/engine/runner.rs

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, info};

use crate::dag::graph::{GraphNode, build_graph};
use crate::dag::scheduler::{Wave, compute_waves};
use crate::dag::step::{CollaboratorKind, Step};
use crate::engine::bindings::Binding;
use crate::engine::context::{RunContext, RunPhase};
use crate::engine::result::PipelineResult;
use crate::errors::{PipelineError, Result};
use crate::exec::bounded::{TaskFailure, run_bounded};
use crate::exec::registry::CollaboratorRegistry;
use crate::types::Concurrency;

/// A zero-argument unit of work for one step.
type StepTask = Pin<Box<dyn Future<Output = anyhow::Result<Binding>> + Send + 'static>>;

/// Options applied to every run of a [`PipelineRunner`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Cap on in-flight steps within a wave (default: unbounded).
    pub concurrency: Concurrency,
}

/// Drives graph building, wave scheduling and bounded execution for a
/// pipeline.
///
/// The registry is shared read-only, so one runner (or clones of it) can
/// serve many concurrent runs; each run gets its own [`RunContext`].
#[derive(Debug, Clone)]
pub struct PipelineRunner {
    registry: Arc<CollaboratorRegistry>,
    options: RunOptions,
}

impl PipelineRunner {
    pub fn new(registry: impl Into<Arc<CollaboratorRegistry>>) -> Self {
        Self::with_options(registry, RunOptions::default())
    }

    pub fn with_options(registry: impl Into<Arc<CollaboratorRegistry>>, options: RunOptions) -> Self {
        Self {
            registry: registry.into(),
            options,
        }
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    pub fn registry(&self) -> &CollaboratorRegistry {
        &self.registry
    }

    /// Run `steps` in a fresh context.
    ///
    /// Runtime errors list the names bound before the abort; see
    /// [`PipelineError::produced`].
    pub async fn execute(&self, steps: &[Step]) -> Result<PipelineResult> {
        let mut ctx = RunContext::new();
        self.execute_in(&mut ctx, steps).await
    }

    /// Run `steps` in a caller-owned context.
    ///
    /// On failure the context keeps everything bound by completed waves. The
    /// context must be fresh ([`RunPhase::Idle`]).
    pub async fn execute_in(&self, ctx: &mut RunContext, steps: &[Step]) -> Result<PipelineResult> {
        ctx.ensure_idle()?;

        match self.drive(ctx, steps).await {
            Ok(()) => {
                ctx.transition(RunPhase::Completed);
                Ok(ctx.result())
            }
            Err(err) => {
                ctx.transition(RunPhase::Failed);
                Err(err)
            }
        }
    }

    async fn drive(&self, ctx: &mut RunContext, steps: &[Step]) -> Result<()> {
        let graph = build_graph(steps)?;
        ctx.transition(RunPhase::Built);

        let waves = compute_waves(graph.nodes())?;
        ctx.transition(RunPhase::Scheduled);

        info!(
            steps = graph.len(),
            waves = waves.len(),
            concurrency = %self.options.concurrency,
            "pipeline scheduled"
        );

        for wave in &waves {
            ctx.transition(RunPhase::Executing { wave: wave.index });
            info!(wave = wave.index, steps = ?wave.step_indices(), "executing wave");

            // Every task of the wave is built before any of them runs, so an
            // unknown collaborator aborts the wave without side effects.
            let tasks = self.build_wave_tasks(ctx, wave)?;

            match run_bounded(tasks, self.options.concurrency).await {
                Ok(values) => {
                    for (node, value) in wave.nodes.iter().zip(values) {
                        ctx.record(node.index, node.outputs.first().cloned(), value);
                    }
                }
                Err(TaskFailure { index, error }) => {
                    let node = &wave.nodes[index];
                    return Err(PipelineError::StepFailed {
                        step_index: node.index,
                        output_name: node.outputs.first().cloned(),
                        produced: ctx.bindings().names(),
                        source: error.into(),
                    });
                }
            }
        }

        Ok(())
    }

    fn build_wave_tasks(&self, ctx: &RunContext, wave: &Wave) -> Result<Vec<StepTask>> {
        wave.nodes
            .iter()
            .map(|node| self.build_task(ctx, node))
            .collect()
    }

    /// Resolve inputs and the collaborator for one node.
    fn build_task(&self, ctx: &RunContext, node: &GraphNode) -> Result<StepTask> {
        let step_index = node.index;
        let unknown = |kind: CollaboratorKind, id: &str| PipelineError::UnknownCollaborator {
            step_index,
            kind,
            id: id.to_string(),
            produced: ctx.bindings().names(),
        };

        match &node.step {
            Step::Produce {
                producer_id,
                params,
                ..
            } => {
                let producer = self
                    .registry
                    .producer(producer_id)
                    .ok_or_else(|| unknown(CollaboratorKind::Producer, producer_id.as_str()))?;
                let params = params.clone();

                Ok(Box::pin(async move {
                    debug!(step = step_index, "calling producer");
                    let artifact = producer.generate(&params).await?;
                    Ok(Binding::Artifact(artifact))
                }))
            }
            Step::Derive {
                input_name,
                transformer_id,
                params,
                ..
            } => {
                let transformer = self
                    .registry
                    .transformer(transformer_id)
                    .ok_or_else(|| unknown(CollaboratorKind::Transformer, transformer_id.as_str()))?;
                let input = ctx.resolve_artifact(step_index, input_name)?;
                let params = params.clone();

                Ok(Box::pin(async move {
                    debug!(step = step_index, "calling transformer");
                    let artifact = transformer.transform(&input, &params).await?;
                    Ok(Binding::Artifact(artifact))
                }))
            }
            Step::Persist {
                input_name,
                destination,
                ..
            } => {
                let persister_id = node.step.collaborator_id();
                let persister = self
                    .registry
                    .persister(persister_id)
                    .ok_or_else(|| unknown(CollaboratorKind::Persister, persister_id))?;
                let input = ctx.resolve_artifact(step_index, input_name)?;
                let destination = destination.clone();

                Ok(Box::pin(async move {
                    debug!(step = step_index, destination = %destination, "calling persister");
                    let ack = persister.persist(&input, &destination).await?;
                    Ok(Binding::Persisted(ack))
                }))
            }
        }
    }
}
