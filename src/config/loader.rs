// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{PipelineFile, RawPipelineFile};
use crate::errors::Result;

/// Parse a pipeline document from a TOML string without validating it.
pub fn parse_str(contents: &str) -> Result<RawPipelineFile> {
    let raw: RawPipelineFile = toml::from_str(contents)?;
    Ok(raw)
}

/// Load a pipeline document from a given path and return the raw
/// `RawPipelineFile`.
///
/// This only performs TOML deserialization; it does **not** check that the
/// steps build and schedule. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPipelineFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_str(&contents)
}

/// Load a pipeline document from path and validate it.
///
/// Checks for:
/// - an empty step list,
/// - duplicate output names,
/// - missing or circular dependencies.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PipelineFile> {
    let raw = load_from_path(path)?;
    PipelineFile::try_from(raw)
}

/// Default pipeline document location: `Pipeline.toml` in the current
/// working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Pipeline.toml")
}
