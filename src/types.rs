// src/types.rs

//! Value types shared by the engine and its collaborators.

use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

/// Canonical artifact name type used throughout the engine.
pub type ArtifactName = String;

/// Collaborator parameters, keyed by parameter name.
pub type Parameters = BTreeMap<String, ParamValue>;

/// A single parameter value as it appears in a pipeline document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ParamValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Integer(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Integer(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::String(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Integer(v.into())
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Integer(v)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Integer(v.into())
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::String(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::String(v)
    }
}

/// Small metadata bag carried alongside artifact bytes.
///
/// The engine never inspects it; collaborators agree on its meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactMetadata {
    /// Format tag, e.g. `"rgb8"` or `"png"`.
    pub format: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Free-form extra entries.
    pub extra: BTreeMap<String, String>,
}

impl ArtifactMetadata {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            ..Self::default()
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

/// Opaque payload passed between steps by name: raw bytes plus metadata.
///
/// Bytes are reference counted, so cloning an artifact into a task is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    data: Arc<[u8]>,
    pub metadata: ArtifactMetadata,
}

impl Artifact {
    pub fn new(data: impl Into<Arc<[u8]>>, metadata: ArtifactMetadata) -> Self {
        Self {
            data: data.into(),
            metadata,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// BLAKE3 hex digest of the payload.
    pub fn digest(&self) -> String {
        blake3::hash(&self.data).to_hex().to_string()
    }
}

/// Acknowledgement returned by a persister.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistResult {
    /// Where the artifact ended up (path, URL, object key...).
    pub location: String,
    pub bytes_written: usize,
    /// BLAKE3 hex digest of what was written.
    pub digest: String,
}

impl PersistResult {
    /// Acknowledge that `artifact` was stored in full at `location`.
    pub fn for_artifact(location: impl Into<String>, artifact: &Artifact) -> Self {
        Self {
            location: location.into(),
            bytes_written: artifact.len(),
            digest: artifact.digest(),
        }
    }
}

/// Upper bound on simultaneously in-flight tasks within a wave.
///
/// Validated during deserialization: `concurrency = 0` is rejected, and the
/// string `"unbounded"` is accepted alongside positive integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "ConcurrencyValue")]
pub enum Concurrency {
    /// Launch every task of a wave at once.
    #[default]
    Unbounded,
    /// At most N tasks in flight; the window is refilled task by task.
    Limited(NonZeroUsize),
}

impl Concurrency {
    /// `Limited(n)`, or `None` when `n == 0`.
    pub fn limited(n: usize) -> Option<Self> {
        NonZeroUsize::new(n).map(Concurrency::Limited)
    }

    /// Number of tasks that may be in flight for a batch of `total` tasks.
    pub fn window(&self, total: usize) -> usize {
        match self {
            Concurrency::Unbounded => total,
            Concurrency::Limited(n) => n.get().min(total),
        }
    }
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concurrency::Unbounded => f.write_str("unbounded"),
            Concurrency::Limited(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for Concurrency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unbounded") {
            return Ok(Concurrency::Unbounded);
        }
        match s.parse::<usize>() {
            Ok(n) => Concurrency::limited(n)
                .ok_or_else(|| "invalid concurrency: 0 (expected >= 1 or \"unbounded\")".to_string()),
            Err(_) => Err(format!(
                "invalid concurrency: {s} (expected a positive integer or \"unbounded\")"
            )),
        }
    }
}

/// Raw shape accepted for `concurrency` in a pipeline document.
#[derive(Deserialize)]
#[serde(untagged)]
enum ConcurrencyValue {
    Count(u64),
    Keyword(String),
}

impl TryFrom<ConcurrencyValue> for Concurrency {
    type Error = String;

    fn try_from(value: ConcurrencyValue) -> Result<Self, Self::Error> {
        match value {
            ConcurrencyValue::Count(n) => usize::try_from(n)
                .ok()
                .and_then(Concurrency::limited)
                .ok_or_else(|| format!("invalid concurrency: {n} (expected >= 1)")),
            ConcurrencyValue::Keyword(s) => s.parse(),
        }
    }
}
