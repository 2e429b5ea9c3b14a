// src/config/model.rs

use serde::Deserialize;

use crate::dag::step::Step;
use crate::types::Concurrency;

/// Pipeline document as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// concurrency = 2
///
/// [[step]]
/// kind = "produce"
/// producer = "solid"
/// output = "original"
/// params = { width = 4, height = 4, value = 10 }
///
/// [[step]]
/// kind = "persist"
/// input = "original"
/// destination = "out/original.raw"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawPipelineFile {
    /// Run behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Steps from `[[step]]`, in document order.
    #[serde(default)]
    pub step: Vec<Step>,
}

/// A validated pipeline document.
///
/// Obtain one through `PipelineFile::try_from(raw)` or
/// [`crate::config::load_and_validate`]; the step list is known to build
/// and schedule.
#[derive(Debug, Clone)]
pub struct PipelineFile {
    pub config: ConfigSection,
    pub steps: Vec<Step>,
}

impl PipelineFile {
    pub(crate) fn new_unchecked(config: ConfigSection, steps: Vec<Step>) -> Self {
        Self { config, steps }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ConfigSection {
    /// Positive integer or `"unbounded"` (default).
    #[serde(default)]
    pub concurrency: Concurrency,
}
