// src/exec/mod.rs

//! Execution layer.
//!
//! - [`bounded`] runs a batch of tasks with a cap on in-flight work and
//!   returns results in input order.
//! - [`registry`] defines the producer / transformer / persister contracts
//!   and the registry the runner resolves step identifiers against.
//! - [`builtin`] contains the collaborators shipped with the binary.

pub mod bounded;
pub mod builtin;
pub mod registry;

pub use bounded::{TaskFailure, run_bounded};
pub use registry::{
    CollaboratorFuture, CollaboratorRegistry, Persister, Producer, Transformer,
};
