// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{PipelineFile, load_and_validate};
use crate::dag::{build_graph, compute_waves};
use crate::engine::{Binding, PipelineResult, PipelineRunner, RunOptions};
use crate::exec::builtin::default_registry;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - pipeline document loading and validation
/// - the built-in collaborator registry
/// - the runner, with `--concurrency` taking precedence over `[config]`
pub async fn run(args: CliArgs) -> Result<()> {
    let path = PathBuf::from(&args.config);
    let pipeline = load_and_validate(&path)
        .with_context(|| format!("loading pipeline {}", path.display()))?;

    let options = RunOptions {
        concurrency: args.concurrency.unwrap_or(pipeline.config.concurrency),
    };

    if args.dry_run {
        print_dry_run(&pipeline, options)?;
        return Ok(());
    }

    let registry = default_registry();
    debug!(?registry, "registered built-in collaborators");

    let runner = PipelineRunner::with_options(registry, options);
    info!(
        pipeline = %path.display(),
        steps = pipeline.steps.len(),
        "starting pipeline"
    );

    let result = runner.execute(&pipeline.steps).await?;
    print_summary(&result);
    Ok(())
}

/// Dry-run output: print the wave plan without calling any collaborator.
fn print_dry_run(pipeline: &PipelineFile, options: RunOptions) -> Result<()> {
    let graph = build_graph(&pipeline.steps)?;
    let waves = compute_waves(graph.nodes())?;

    println!("pipedag dry-run");
    println!("  concurrency = {}", options.concurrency);
    println!();

    println!("waves ({}):", waves.len());
    for wave in &waves {
        println!("  wave {}:", wave.index);
        for node in &wave.nodes {
            println!("    [{}] {}", node.index, node.step);
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

fn print_summary(result: &PipelineResult) {
    println!("pipeline completed ({} steps):", result.len());
    for step in result.iter() {
        let name = step.output_name.as_deref().unwrap_or("-");
        match &step.value {
            Binding::Artifact(artifact) => println!(
                "  [{}] {name}: {} artifact, {} bytes, blake3 {}",
                step.step_index,
                artifact.metadata.format,
                artifact.len(),
                artifact.digest()
            ),
            Binding::Persisted(ack) => println!(
                "  [{}] {name}: persisted {} bytes to {}",
                step.step_index, ack.bytes_written, ack.location
            ),
        }
    }
}
