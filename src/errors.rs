// src/errors.rs

//! Crate-wide error taxonomy.
//!
//! Structural errors (`ConfigError`, `CircularOrMissingDependency`,
//! `NotAnArtifact`) are raised before any collaborator is called. Runtime
//! errors abort the run but leave already-completed waves in place; they
//! carry the names bound so far.

use thiserror::Error;

use crate::dag::scheduler::UnsatisfiedDependencies;
use crate::dag::step::CollaboratorKind;
use crate::types::ArtifactName;

/// Boxed error coming out of an external collaborator.
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Circular or missing dependency: {0}")]
    CircularOrMissingDependency(UnsatisfiedDependencies),

    #[error("step {step_index} references unknown {kind} '{id}'")]
    UnknownCollaborator {
        step_index: usize,
        kind: CollaboratorKind,
        id: String,
        /// Artifact names bound by earlier waves, sorted.
        produced: Vec<ArtifactName>,
    },

    #[error("step {step_index} reads '{name}', which is not bound")]
    UnresolvedBinding {
        step_index: usize,
        name: ArtifactName,
        /// Artifact names bound by earlier waves, sorted.
        produced: Vec<ArtifactName>,
    },

    /// Raised while building the graph, so nothing has run yet.
    #[error("step {step_index} reads '{name}', which is a persistence result, not an artifact")]
    NotAnArtifact {
        step_index: usize,
        name: ArtifactName,
    },

    #[error("step {step_index} failed: {source}")]
    StepFailed {
        step_index: usize,
        /// Output name declared by the failed step, if any.
        output_name: Option<ArtifactName>,
        /// Artifact names bound before the failure, sorted.
        produced: Vec<ArtifactName>,
        #[source]
        source: CollaboratorError,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Artifact names bound before a runtime abort.
    ///
    /// `None` for structural errors, which are raised before any step runs.
    pub fn produced(&self) -> Option<&[ArtifactName]> {
        match self {
            PipelineError::UnknownCollaborator { produced, .. }
            | PipelineError::UnresolvedBinding { produced, .. }
            | PipelineError::StepFailed { produced, .. } => Some(produced.as_slice()),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
