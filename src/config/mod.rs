// src/config/mod.rs

//! Pipeline document loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a document from disk or a string (`loader.rs`).
//! - Validate that the steps build and schedule (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, parse_str};
pub use model::{ConfigSection, PipelineFile, RawPipelineFile};
pub use validate::validate_raw_pipeline;
