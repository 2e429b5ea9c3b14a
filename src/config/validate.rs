// src/config/validate.rs

use crate::config::model::{PipelineFile, RawPipelineFile};
use crate::dag::graph::build_graph;
use crate::dag::scheduler::compute_waves;
use crate::errors::{PipelineError, Result};

impl TryFrom<RawPipelineFile> for PipelineFile {
    type Error = PipelineError;

    fn try_from(raw: RawPipelineFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_pipeline(&raw)?;
        Ok(PipelineFile::new_unchecked(raw.config, raw.step))
    }
}

/// Run every document-level check without consuming the document.
pub fn validate_raw_pipeline(raw: &RawPipelineFile) -> Result<()> {
    ensure_has_steps(raw)?;
    validate_schedule(raw)?;
    Ok(())
}

fn ensure_has_steps(raw: &RawPipelineFile) -> Result<()> {
    if raw.step.is_empty() {
        return Err(PipelineError::ConfigError(
            "pipeline must contain at least one [[step]] section".to_string(),
        ));
    }
    Ok(())
}

// `concurrency` is strongly typed and validated during deserialization, so
// `[config]` needs no check here.

fn validate_schedule(raw: &RawPipelineFile) -> Result<()> {
    let graph = build_graph(&raw.step)?;
    compute_waves(graph.nodes())?;
    Ok(())
}
