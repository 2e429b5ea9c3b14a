// src/dag/graph.rs

use std::collections::{BTreeSet, HashMap};

use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::step::Step;
use crate::errors::{PipelineError, Result};
use crate::types::ArtifactName;

/// A step annotated with the artifact names it reads and writes.
///
/// `index` is the step's position in the original list; it is used for
/// result ordering and error attribution.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub index: usize,
    pub step: Step,
    /// Names this step must read (empty for `Produce`).
    pub dependencies: BTreeSet<ArtifactName>,
    /// Names this step writes (zero or one entries).
    pub outputs: Vec<ArtifactName>,
}

impl GraphNode {
    fn from_step(index: usize, step: &Step) -> Self {
        Self {
            index,
            step: step.clone(),
            dependencies: step.input_name().map(str::to_string).into_iter().collect(),
            outputs: step.output_name().map(str::to_string).into_iter().collect(),
        }
    }
}

/// Nodes of a pipeline in original step order, plus an index from output
/// name to the node that produces it.
///
/// Building performs no ordering validation: a step may read a name that is
/// produced further down the list, or by nobody at all. Both are scheduling
/// concerns (see [`crate::dag::scheduler`]).
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineGraph {
    nodes: Vec<GraphNode>,
    producers: HashMap<ArtifactName, usize>,
}

/// Build the dependency graph for an ordered step list.
///
/// Fails with [`PipelineError::ConfigError`] if two steps declare the same
/// output name, and with [`PipelineError::NotAnArtifact`] if a step reads the
/// output of a persist step (an acknowledgement, never an artifact).
pub fn build_graph(steps: &[Step]) -> Result<PipelineGraph> {
    let mut nodes = Vec::with_capacity(steps.len());
    let mut producers: HashMap<ArtifactName, usize> = HashMap::new();

    for (index, step) in steps.iter().enumerate() {
        let node = GraphNode::from_step(index, step);

        for output in &node.outputs {
            if let Some(&first) = producers.get(output) {
                return Err(PipelineError::ConfigError(format!(
                    "output name '{output}' is declared by both step {first} and step {index}"
                )));
            }
            producers.insert(output.clone(), index);
        }

        nodes.push(node);
    }

    ensure_inputs_are_artifacts(&nodes, &producers)?;

    debug!(
        steps = nodes.len(),
        outputs = producers.len(),
        "built pipeline dependency graph"
    );

    Ok(PipelineGraph { nodes, producers })
}

fn ensure_inputs_are_artifacts(
    nodes: &[GraphNode],
    producers: &HashMap<ArtifactName, usize>,
) -> Result<()> {
    for node in nodes {
        for dep in &node.dependencies {
            let Some(&producer) = producers.get(dep) else {
                continue;
            };
            if matches!(nodes[producer].step, Step::Persist { .. }) {
                return Err(PipelineError::NotAnArtifact {
                    step_index: node.index,
                    name: dep.clone(),
                });
            }
        }
    }
    Ok(())
}

impl PipelineGraph {
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<GraphNode> {
        self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Index of the step that declares `name` as its output.
    pub fn producer_of(&self, name: &str) -> Option<usize> {
        self.producers.get(name).copied()
    }

    /// Indices of steps reading any output of step `index`, in step order.
    pub fn dependents_of(&self, index: usize) -> Vec<usize> {
        let Some(node) = self.nodes.get(index) else {
            return Vec::new();
        };

        self.nodes
            .iter()
            .filter(|other| other.dependencies.iter().any(|d| node.outputs.contains(d)))
            .map(|other| other.index)
            .collect()
    }

    /// Step-level dependency edges (`producer -> consumer`) as a petgraph
    /// graph. Reads of names nobody produces contribute no edge.
    pub fn dependency_graph(&self) -> DiGraphMap<usize, ()> {
        step_dependency_graph(&self.nodes, &self.producers)
    }
}

/// Edge direction: producer -> consumer.
pub(crate) fn step_dependency_graph(
    nodes: &[GraphNode],
    producers: &HashMap<ArtifactName, usize>,
) -> DiGraphMap<usize, ()> {
    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();

    for node in nodes {
        graph.add_node(node.index);
    }

    for node in nodes {
        for dep in &node.dependencies {
            if let Some(&producer) = producers.get(dep) {
                graph.add_edge(producer, node.index, ());
            }
        }
    }

    graph
}
