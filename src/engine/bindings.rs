// src/engine/bindings.rs

//! Per-run binding table: artifact name -> realized value.

use std::collections::HashMap;

use crate::types::{Artifact, ArtifactName, PersistResult};

/// Value bound to an artifact name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Artifact(Artifact),
    Persisted(PersistResult),
}

impl Binding {
    pub fn as_artifact(&self) -> Option<&Artifact> {
        match self {
            Binding::Artifact(a) => Some(a),
            Binding::Persisted(_) => None,
        }
    }

    pub fn as_persisted(&self) -> Option<&PersistResult> {
        match self {
            Binding::Persisted(p) => Some(p),
            Binding::Artifact(_) => None,
        }
    }
}

/// Append/lookup map populated wave by wave.
///
/// The runner writes to it only between waves and tasks receive cloned
/// inputs, so it needs no synchronisation.
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    entries: HashMap<ArtifactName, Binding>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.entries.get(name)
    }

    pub fn artifact(&self, name: &str) -> Option<&Artifact> {
        self.get(name).and_then(Binding::as_artifact)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bound names, sorted.
    pub fn names(&self) -> Vec<ArtifactName> {
        let mut names: Vec<ArtifactName> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Bind `name`. Returns `false` (and keeps the old value) if it was
    /// already bound; graph building rules that out for a single run.
    pub(crate) fn insert(&mut self, name: ArtifactName, value: Binding) -> bool {
        if self.entries.contains_key(&name) {
            return false;
        }
        self.entries.insert(name, value);
        true
    }
}
