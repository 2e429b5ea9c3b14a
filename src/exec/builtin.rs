// src/exec/builtin.rs

//! Built-in collaborators registered by the `pipedag` binary.
//!
//! - `solid` producer: a `width x height` rgb8 image filled with `value`.
//! - `invert` transformer: bytewise `255 - b`, metadata unchanged.
//! - `grayscale` transformer: rgb8 -> gray8 by channel average.
//! - `file` persister: writes the raw bytes to a local path.

use std::path::PathBuf;

use anyhow::{Context, anyhow, bail};
use tracing::debug;

use crate::exec::registry::{
    CollaboratorFuture, CollaboratorRegistry, Persister, Producer, Transformer,
};
use crate::types::{Artifact, ArtifactMetadata, Parameters, PersistResult};

pub const RGB8: &str = "rgb8";
pub const GRAY8: &str = "gray8";

/// Registry containing every built-in collaborator.
pub fn default_registry() -> CollaboratorRegistry {
    CollaboratorRegistry::new()
        .with_producer("solid", SolidProducer)
        .with_transformer("invert", InvertTransformer)
        .with_transformer("grayscale", GrayscaleTransformer)
        .with_persister("file", FilePersister)
}

/// Read an integer parameter in `min..=max`, falling back to `default`.
fn int_param(params: &Parameters, key: &str, default: i64, min: i64, max: i64) -> anyhow::Result<i64> {
    let value = match params.get(key) {
        None => default,
        Some(v) => v
            .as_i64()
            .ok_or_else(|| anyhow!("parameter '{key}' must be an integer (got {v})"))?,
    };
    if !(min..=max).contains(&value) {
        bail!("parameter '{key}' must be in {min}..={max} (got {value})");
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SolidProducer;

impl Producer for SolidProducer {
    fn generate<'a>(&'a self, params: &'a Parameters) -> CollaboratorFuture<'a, Artifact> {
        Box::pin(async move {
            let width = int_param(params, "width", 1, 1, u32::MAX.into())? as u32;
            let height = int_param(params, "height", 1, 1, u32::MAX.into())? as u32;
            let value = int_param(params, "value", 0, 0, 255)? as u8;

            let len = (width as usize)
                .checked_mul(height as usize)
                .and_then(|px| px.checked_mul(3))
                .ok_or_else(|| anyhow!("image of {width}x{height} is too large"))?;

            debug!(width, height, value, "generating solid rgb8 image");
            Ok(Artifact::new(
                vec![value; len],
                ArtifactMetadata::new(RGB8).with_dimensions(width, height),
            ))
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InvertTransformer;

impl Transformer for InvertTransformer {
    fn transform<'a>(
        &'a self,
        input: &'a Artifact,
        _params: &'a Parameters,
    ) -> CollaboratorFuture<'a, Artifact> {
        Box::pin(async move {
            let inverted: Vec<u8> = input.bytes().iter().map(|b| 255 - b).collect();
            Ok(Artifact::new(inverted, input.metadata.clone()))
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GrayscaleTransformer;

impl Transformer for GrayscaleTransformer {
    fn transform<'a>(
        &'a self,
        input: &'a Artifact,
        _params: &'a Parameters,
    ) -> CollaboratorFuture<'a, Artifact> {
        Box::pin(async move {
            if input.metadata.format != RGB8 {
                bail!(
                    "grayscale expects {RGB8} input (got '{}')",
                    input.metadata.format
                );
            }
            if input.len() % 3 != 0 {
                bail!("{RGB8} payload length {} is not a multiple of 3", input.len());
            }

            let gray: Vec<u8> = input
                .bytes()
                .chunks_exact(3)
                .map(|px| ((px[0] as u16 + px[1] as u16 + px[2] as u16) / 3) as u8)
                .collect();

            let mut metadata = input.metadata.clone();
            metadata.format = GRAY8.to_string();
            Ok(Artifact::new(gray, metadata))
        })
    }
}

/// Writes artifacts to the local filesystem.
///
/// A leading `file://` is stripped from the destination; missing parent
/// directories are created.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilePersister;

impl Persister for FilePersister {
    fn persist<'a>(
        &'a self,
        input: &'a Artifact,
        destination: &'a str,
    ) -> CollaboratorFuture<'a, PersistResult> {
        Box::pin(async move {
            let path = PathBuf::from(destination.strip_prefix("file://").unwrap_or(destination));

            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .with_context(|| format!("creating directory {}", parent.display()))?;
                }
            }

            tokio::fs::write(&path, input.bytes())
                .await
                .with_context(|| format!("writing artifact to {}", path.display()))?;

            debug!(path = %path.display(), bytes = input.len(), "artifact written");
            Ok(PersistResult::for_artifact(path.display().to_string(), input))
        })
    }
}
