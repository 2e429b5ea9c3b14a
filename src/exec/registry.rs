// src/exec/registry.rs

//! Collaborator contracts and the registry that maps step identifiers to
//! handlers.
//!
//! The engine never implements image work itself. Steps name a producer,
//! transformer or persister by string id; the runner looks the id up here.
//! Tests register fakes that record calls or simulate latency and failure.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::dag::step::CollaboratorKind;
use crate::types::{Artifact, Parameters, PersistResult};

/// Boxed future returned by collaborator calls.
pub type CollaboratorFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;

/// Creates a new artifact from parameters.
pub trait Producer: Send + Sync {
    fn generate<'a>(&'a self, params: &'a Parameters) -> CollaboratorFuture<'a, Artifact>;
}

/// Derives a new artifact from an existing one.
pub trait Transformer: Send + Sync {
    fn transform<'a>(
        &'a self,
        input: &'a Artifact,
        params: &'a Parameters,
    ) -> CollaboratorFuture<'a, Artifact>;
}

/// Durably stores an artifact.
pub trait Persister: Send + Sync {
    fn persist<'a>(
        &'a self,
        input: &'a Artifact,
        destination: &'a str,
    ) -> CollaboratorFuture<'a, PersistResult>;
}

/// Mapping from collaborator id to handler.
///
/// Populate it before a run starts; the runner only reads it, and shares it
/// between concurrent runs behind an `Arc`.
#[derive(Default, Clone)]
pub struct CollaboratorRegistry {
    producers: HashMap<String, Arc<dyn Producer>>,
    transformers: HashMap<String, Arc<dyn Transformer>>,
    persisters: HashMap<String, Arc<dyn Persister>>,
}

impl fmt::Debug for CollaboratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollaboratorRegistry")
            .field("producers", &sorted_keys(&self.producers))
            .field("transformers", &sorted_keys(&self.transformers))
            .field("persisters", &sorted_keys(&self.persisters))
            .finish()
    }
}

impl CollaboratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a producer under `id`.
    pub fn register_producer(&mut self, id: impl Into<String>, producer: impl Producer + 'static) {
        self.producers.insert(id.into(), Arc::new(producer));
    }

    pub fn register_transformer(
        &mut self,
        id: impl Into<String>,
        transformer: impl Transformer + 'static,
    ) {
        self.transformers.insert(id.into(), Arc::new(transformer));
    }

    pub fn register_persister(
        &mut self,
        id: impl Into<String>,
        persister: impl Persister + 'static,
    ) {
        self.persisters.insert(id.into(), Arc::new(persister));
    }

    /// Builder-style variant of [`register_producer`](Self::register_producer).
    pub fn with_producer(mut self, id: impl Into<String>, producer: impl Producer + 'static) -> Self {
        self.register_producer(id, producer);
        self
    }

    pub fn with_transformer(
        mut self,
        id: impl Into<String>,
        transformer: impl Transformer + 'static,
    ) -> Self {
        self.register_transformer(id, transformer);
        self
    }

    pub fn with_persister(
        mut self,
        id: impl Into<String>,
        persister: impl Persister + 'static,
    ) -> Self {
        self.register_persister(id, persister);
        self
    }

    pub fn producer(&self, id: &str) -> Option<Arc<dyn Producer>> {
        self.producers.get(id).cloned()
    }

    pub fn transformer(&self, id: &str) -> Option<Arc<dyn Transformer>> {
        self.transformers.get(id).cloned()
    }

    pub fn persister(&self, id: &str) -> Option<Arc<dyn Persister>> {
        self.persisters.get(id).cloned()
    }

    /// Whether a collaborator of `kind` is registered under `id`.
    pub fn contains(&self, kind: CollaboratorKind, id: &str) -> bool {
        match kind {
            CollaboratorKind::Producer => self.producers.contains_key(id),
            CollaboratorKind::Transformer => self.transformers.contains_key(id),
            CollaboratorKind::Persister => self.persisters.contains_key(id),
        }
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<&str> {
    let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}
