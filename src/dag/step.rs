// src/dag/step.rs

//! Typed pipeline instructions.

use std::fmt;

use serde::Deserialize;

use crate::types::{ArtifactName, Parameters};

/// Persister used for plain destinations without a URI scheme.
pub const DEFAULT_PERSISTER: &str = "file";

/// One pipeline instruction.
///
/// This maps directly onto a `[[step]]` table of a pipeline document:
///
/// ```toml
/// [[step]]
/// kind = "derive"
/// input = "original"
/// transformer = "resize"
/// output = "small"
/// params = { width = 64 }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Step {
    /// Create a new artifact from parameters alone.
    Produce {
        #[serde(rename = "producer")]
        producer_id: String,
        #[serde(default)]
        params: Parameters,
        #[serde(rename = "output")]
        output_name: ArtifactName,
    },
    /// Derive a new artifact from one named artifact.
    Derive {
        #[serde(rename = "input")]
        input_name: ArtifactName,
        #[serde(rename = "transformer")]
        transformer_id: String,
        #[serde(default)]
        params: Parameters,
        #[serde(rename = "output")]
        output_name: ArtifactName,
    },
    /// Durably store a named artifact.
    ///
    /// `persister_id` is optional; see [`Step::collaborator_id`] for the
    /// fallback. Without `output_name` the step binds nothing.
    Persist {
        #[serde(rename = "input")]
        input_name: ArtifactName,
        destination: String,
        #[serde(default, rename = "persister")]
        persister_id: Option<String>,
        #[serde(default, rename = "output")]
        output_name: Option<ArtifactName>,
    },
}

impl Step {
    pub fn produce(producer_id: impl Into<String>, output_name: impl Into<ArtifactName>) -> Self {
        Step::Produce {
            producer_id: producer_id.into(),
            params: Parameters::new(),
            output_name: output_name.into(),
        }
    }

    pub fn derive(
        input_name: impl Into<ArtifactName>,
        transformer_id: impl Into<String>,
        output_name: impl Into<ArtifactName>,
    ) -> Self {
        Step::Derive {
            input_name: input_name.into(),
            transformer_id: transformer_id.into(),
            params: Parameters::new(),
            output_name: output_name.into(),
        }
    }

    pub fn persist(input_name: impl Into<ArtifactName>, destination: impl Into<String>) -> Self {
        Step::Persist {
            input_name: input_name.into(),
            destination: destination.into(),
            persister_id: None,
            output_name: None,
        }
    }

    pub fn kind(&self) -> CollaboratorKind {
        match self {
            Step::Produce { .. } => CollaboratorKind::Producer,
            Step::Derive { .. } => CollaboratorKind::Transformer,
            Step::Persist { .. } => CollaboratorKind::Persister,
        }
    }

    /// The artifact this step reads, if any.
    pub fn input_name(&self) -> Option<&str> {
        match self {
            Step::Produce { .. } => None,
            Step::Derive { input_name, .. } | Step::Persist { input_name, .. } => {
                Some(input_name.as_str())
            }
        }
    }

    /// The name this step binds, if any.
    pub fn output_name(&self) -> Option<&str> {
        match self {
            Step::Produce { output_name, .. } | Step::Derive { output_name, .. } => {
                Some(output_name.as_str())
            }
            Step::Persist { output_name, .. } => output_name.as_deref(),
        }
    }

    /// Identifier of the collaborator this step invokes.
    ///
    /// Persist steps without an explicit `persister` use the destination's
    /// URI scheme (`s3://bucket/key` -> `s3`), or [`DEFAULT_PERSISTER`] for
    /// plain paths.
    pub fn collaborator_id(&self) -> &str {
        match self {
            Step::Produce { producer_id, .. } => producer_id.as_str(),
            Step::Derive { transformer_id, .. } => transformer_id.as_str(),
            Step::Persist {
                persister_id,
                destination,
                ..
            } => match persister_id {
                Some(id) => id.as_str(),
                None => scheme_of(destination).unwrap_or(DEFAULT_PERSISTER),
            },
        }
    }
}

fn scheme_of(destination: &str) -> Option<&str> {
    let (scheme, _) = destination.split_once("://")?;
    let valid = !scheme.is_empty()
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Produce {
                producer_id,
                output_name,
                ..
            } => write!(f, "produce {producer_id} -> {output_name}"),
            Step::Derive {
                input_name,
                transformer_id,
                output_name,
                ..
            } => write!(f, "derive {input_name} via {transformer_id} -> {output_name}"),
            Step::Persist {
                input_name,
                destination,
                output_name,
                ..
            } => {
                write!(
                    f,
                    "persist {input_name} via {} to {destination}",
                    self.collaborator_id()
                )?;
                if let Some(out) = output_name {
                    write!(f, " -> {out}")?;
                }
                Ok(())
            }
        }
    }
}

/// The three collaborator capabilities a step can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollaboratorKind {
    Producer,
    Transformer,
    Persister,
}

impl fmt::Display for CollaboratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollaboratorKind::Producer => f.write_str("producer"),
            CollaboratorKind::Transformer => f.write_str("transformer"),
            CollaboratorKind::Persister => f.write_str("persister"),
        }
    }
}
