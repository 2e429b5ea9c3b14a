// src/engine/mod.rs

//! Orchestration engine for pipedag.
//!
//! This module ties together:
//! - the dependency graph builder and wave scheduler (`crate::dag`)
//! - the bounded executor and collaborator registry (`crate::exec`)
//! - the per-run binding table and phase tracking
//!
//! A run goes `Idle -> Built -> Scheduled -> Executing(wave i) ->
//! Completed | Failed`. Waves run strictly in order; the binding table is
//! written only between waves.

pub mod bindings;
pub mod context;
pub mod result;
pub mod runner;

pub use bindings::{Binding, BindingTable};
pub use context::{RunContext, RunPhase};
pub use result::{PipelineResult, StepResult};
pub use runner::{PipelineRunner, RunOptions};
