// src/dag/scheduler.rs

//! Wave scheduling.
//!
//! A wave is the maximal set of not-yet-scheduled nodes whose dependencies
//! were all bound by strictly earlier waves. Nodes inside a wave never read
//! each other's outputs, so they may run concurrently; waves run in order.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use petgraph::algo::tarjan_scc;
use tracing::{debug, warn};

use crate::dag::graph::{GraphNode, step_dependency_graph};
use crate::errors::{PipelineError, Result};
use crate::types::ArtifactName;

/// Nodes that may execute concurrently, in original step order.
#[derive(Debug, Clone, PartialEq)]
pub struct Wave {
    /// Position of this wave in the schedule.
    pub index: usize,
    pub nodes: Vec<GraphNode>,
}

impl Wave {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Original step indices of the nodes in this wave.
    pub fn step_indices(&self) -> Vec<usize> {
        self.nodes.iter().map(|n| n.index).collect()
    }
}

/// Group nodes into ordered waves using greedy earliest-wave placement.
///
/// Each pass scans every unscheduled node and collects those whose
/// dependencies are all in the bound set. Outputs of a wave are only added
/// to the bound set after the whole pass, which is what keeps nodes of the
/// same wave independent. O(N^2) in the worst case.
///
/// Fails with [`PipelineError::CircularOrMissingDependency`] when a pass
/// finds nothing ready while nodes remain.
pub fn compute_waves(nodes: &[GraphNode]) -> Result<Vec<Wave>> {
    let mut bound: HashSet<&str> = HashSet::new();
    let mut remaining: Vec<&GraphNode> = nodes.iter().collect();
    let mut waves: Vec<Wave> = Vec::new();

    while !remaining.is_empty() {
        let (ready, blocked): (Vec<&GraphNode>, Vec<&GraphNode>) = remaining
            .into_iter()
            .partition(|node| node.dependencies.iter().all(|d| bound.contains(d.as_str())));

        if ready.is_empty() {
            let unsatisfied = UnsatisfiedDependencies::diagnose(nodes, &blocked, &bound);
            warn!(
                unscheduled = blocked.len(),
                "no step is ready; pipeline cannot be scheduled"
            );
            return Err(PipelineError::CircularOrMissingDependency(unsatisfied));
        }

        for node in ready.iter().copied() {
            bound.extend(node.outputs.iter().map(String::as_str));
        }

        let wave = Wave {
            index: waves.len(),
            nodes: ready.into_iter().cloned().collect(),
        };
        debug!(
            wave = wave.index,
            steps = ?wave.step_indices(),
            "scheduled wave"
        );
        waves.push(wave);

        remaining = blocked;
    }

    Ok(waves)
}

/// A step that could not be scheduled, with the names it is still waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedStep {
    pub step_index: usize,
    pub output_name: Option<ArtifactName>,
    pub unmet: Vec<ArtifactName>,
}

/// Diagnosis attached to [`PipelineError::CircularOrMissingDependency`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsatisfiedDependencies {
    /// Every unscheduled step, in step order.
    pub unresolved: Vec<UnresolvedStep>,
    /// Names read by some step but declared as output by none.
    pub undeclared: Vec<ArtifactName>,
    /// Groups of step indices that depend on each other in a cycle.
    pub cycles: Vec<Vec<usize>>,
}

impl UnsatisfiedDependencies {
    fn diagnose(all: &[GraphNode], blocked: &[&GraphNode], bound: &HashSet<&str>) -> Self {
        let declared: HashMap<ArtifactName, usize> = all
            .iter()
            .flat_map(|n| n.outputs.iter().map(move |o| (o.clone(), n.index)))
            .collect();

        let unresolved: Vec<UnresolvedStep> = blocked
            .iter()
            .map(|node| UnresolvedStep {
                step_index: node.index,
                output_name: node.outputs.first().cloned(),
                unmet: node
                    .dependencies
                    .iter()
                    .filter(|d| !bound.contains(d.as_str()))
                    .cloned()
                    .collect(),
            })
            .collect();

        let undeclared: Vec<ArtifactName> = unresolved
            .iter()
            .flat_map(|u| u.unmet.iter())
            .filter(|name| !declared.contains_key(name.as_str()))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let blocked_nodes: Vec<GraphNode> = blocked.iter().map(|n| (*n).clone()).collect();
        let graph = step_dependency_graph(&blocked_nodes, &declared);
        let mut cycles: Vec<Vec<usize>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1 || graph.contains_edge(component[0], component[0])
            })
            .map(|mut component| {
                component.sort_unstable();
                component
            })
            .collect();
        cycles.sort();

        Self {
            unresolved,
            undeclared,
            cycles,
        }
    }
}

impl fmt::Display for UnsatisfiedDependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} step(s) cannot be scheduled:", self.unresolved.len())?;
        for step in &self.unresolved {
            write!(f, " step {}", step.step_index)?;
            if let Some(out) = &step.output_name {
                write!(f, " (-> {out})")?;
            }
            write!(f, " waits on [{}];", step.unmet.join(", "))?;
        }
        if !self.undeclared.is_empty() {
            write!(f, " never produced: [{}];", self.undeclared.join(", "))?;
        }
        for cycle in &self.cycles {
            let members: Vec<String> = cycle.iter().map(|i| i.to_string()).collect();
            write!(f, " cycle among steps [{}];", members.join(", "))?;
        }
        Ok(())
    }
}
