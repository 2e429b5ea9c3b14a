#![allow(dead_code)]

use pipedag::config::{ConfigSection, PipelineFile, RawPipelineFile};
use pipedag::dag::Step;
use pipedag::types::{Concurrency, ParamValue};

/// Builder for `PipelineFile` to simplify test setup.
pub struct PipelineFileBuilder {
    raw: RawPipelineFile,
}

impl PipelineFileBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawPipelineFile {
                config: ConfigSection::default(),
                step: Vec::new(),
            },
        }
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.raw.step.push(step);
        self
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.raw.config.concurrency = Concurrency::limited(n).expect("concurrency must be >= 1");
        self
    }

    pub fn build_raw(self) -> RawPipelineFile {
        self.raw
    }

    pub fn build(self) -> PipelineFile {
        PipelineFile::try_from(self.raw).expect("Failed to build valid pipeline from builder")
    }
}

impl Default for PipelineFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a single `Step`.
pub struct StepBuilder {
    step: Step,
}

impl StepBuilder {
    pub fn produce(producer: &str, output: &str) -> Self {
        Self {
            step: Step::produce(producer, output),
        }
    }

    pub fn derive(input: &str, transformer: &str, output: &str) -> Self {
        Self {
            step: Step::derive(input, transformer, output),
        }
    }

    pub fn persist(input: &str, destination: &str) -> Self {
        Self {
            step: Step::persist(input, destination),
        }
    }

    /// Add a collaborator parameter (produce / derive only).
    pub fn param(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        match &mut self.step {
            Step::Produce { params, .. } | Step::Derive { params, .. } => {
                params.insert(key.to_string(), value.into());
            }
            Step::Persist { .. } => panic!("persist steps take no parameters"),
        }
        self
    }

    /// Explicit persister id (persist only).
    pub fn persister(mut self, id: &str) -> Self {
        match &mut self.step {
            Step::Persist { persister_id, .. } => *persister_id = Some(id.to_string()),
            _ => panic!("only persist steps name a persister"),
        }
        self
    }

    /// Output name for a persist step.
    pub fn output(mut self, name: &str) -> Self {
        match &mut self.step {
            Step::Persist { output_name, .. } => *output_name = Some(name.to_string()),
            _ => panic!("produce/derive outputs are set in the constructor"),
        }
        self
    }

    pub fn build(self) -> Step {
        self.step
    }
}

/// Shorthand for the common step shapes.
pub fn produce(output: &str) -> Step {
    Step::produce("fake", output)
}

pub fn derive(input: &str, output: &str) -> Step {
    Step::derive(input, "append", output)
}

pub fn persist(input: &str) -> Step {
    Step::persist(input, format!("mem://{input}"))
}
