// src/dag/mod.rs

//! Pipeline steps, dependency extraction and wave scheduling.
//!
//! - [`step`] holds the closed `Step` type.
//! - [`graph`] turns an ordered step list into nodes with dependency and
//!   output sets.
//! - [`scheduler`] groups nodes into ordered waves of independent steps.

pub mod graph;
pub mod scheduler;
pub mod step;

pub use graph::{GraphNode, PipelineGraph, build_graph};
pub use scheduler::{UnresolvedStep, UnsatisfiedDependencies, Wave, compute_waves};
pub use step::{CollaboratorKind, Step};
