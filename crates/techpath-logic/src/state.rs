//! Per-run node state.
//!
//! A `Snapshot` is a flat array of plain `NodeState` values indexed like the
//! graph's nodes. Counterfactual runs clone the array; the canonical
//! `TechGraph` is never touched.

use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::graph::TechGraph;
use crate::readiness::ReadinessModel;

/// Development status of a technology in a given year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TechStatus {
    /// Waiting on at least one incomplete prerequisite.
    Pending,
    /// Every prerequisite complete; work progresses this year.
    Active,
    /// Finished. Terminal.
    Completed,
}

impl fmt::Display for TechStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::Active => "Active",
            Self::Completed => "Completed",
        };
        f.write_str(s)
    }
}

/// Simulation-scoped state of one node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    /// Originally estimated duration, floored so it can divide.
    pub initial_time: f64,
    pub initial_probability: f64,
    pub time_remaining: f64,
    pub prob_of_success: f64,
    pub is_complete: bool,
    pub deployment_year: Option<i32>,
    pub deployed_capacity_mw: f64,
}

impl NodeState {
    /// Fresh state from readiness metadata.
    pub fn seed(node: &crate::graph::Node, model: &ReadinessModel) -> Self {
        let estimate = model.initial_time_estimate(node);
        let probability = model.initial_probability(node);
        let is_complete = estimate <= 0.0;
        Self {
            initial_time: model.risk_horizon(estimate),
            initial_probability: probability,
            time_remaining: estimate,
            prob_of_success: if is_complete { 1.0 } else { probability },
            is_complete,
            deployment_year: None,
            deployed_capacity_mw: 0.0,
        }
    }

    /// Linear risk reduction toward certainty over the original estimate.
    pub fn risk_reduction_per_year(&self) -> f64 {
        (1.0 - self.initial_probability) / self.initial_time
    }

    /// One year of development work.
    ///
    /// Time drops by a year (floored at zero) and probability rises by the
    /// annual risk reduction (capped at one). Reaching zero time completes
    /// the node and forces its probability to one. No-op once complete.
    pub fn advance_one_year(&mut self) {
        if self.is_complete {
            return;
        }
        if self.time_remaining > 0.0 {
            self.time_remaining = (self.time_remaining - 1.0).max(0.0);
            self.prob_of_success = (self.prob_of_success + self.risk_reduction_per_year()).min(1.0);
        }
        if self.time_remaining <= 0.0 {
            self.is_complete = true;
            self.prob_of_success = 1.0;
        }
    }
}

/// All node states of one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    states: Vec<NodeState>,
}

impl Snapshot {
    /// Seed every node of `graph` from the readiness model.
    pub fn seed(graph: &TechGraph, model: &ReadinessModel) -> Self {
        Self {
            states: graph
                .nodes()
                .iter()
                .map(|n| NodeState::seed(n, model))
                .collect(),
        }
    }

    pub fn from_states(states: Vec<NodeState>) -> Self {
        Self { states }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> &[NodeState] {
        &self.states
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut NodeState {
        &mut self.states[idx]
    }

    /// AND over every prerequisite's completion flag.
    pub fn prerequisites_complete(&self, graph: &TechGraph, idx: usize) -> bool {
        graph
            .prerequisite_indices(idx)
            .iter()
            .all(|&p| self.states[p].is_complete)
    }

    /// Status of `idx` given the current completion flags.
    pub fn status_of(&self, graph: &TechGraph, idx: usize) -> TechStatus {
        if self.states[idx].is_complete {
            TechStatus::Completed
        } else if self.prerequisites_complete(graph, idx) {
            TechStatus::Active
        } else {
            TechStatus::Pending
        }
    }

    /// Advance one simulated year.
    ///
    /// Statuses are fixed from the completion flags at the start of the year,
    /// then every active milestone or enabling technology does one year of
    /// work. Returns those start-of-year statuses for every node.
    pub fn advance_year(&mut self, graph: &TechGraph) -> Vec<TechStatus> {
        let statuses: Vec<TechStatus> = (0..self.states.len())
            .map(|i| self.status_of(graph, i))
            .collect();

        for idx in graph.acceleratable_indices() {
            if statuses[idx] == TechStatus::Active {
                self.states[idx].advance_one_year();
            }
        }
        statuses
    }
}

impl Index<usize> for Snapshot {
    type Output = NodeState;

    fn index(&self, idx: usize) -> &NodeState {
        &self.states[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, GraphData, Node, NodeType};

    fn chain() -> TechGraph {
        TechGraph::new(GraphData {
            nodes: vec![
                Node::new("a", "A", NodeType::EnablingTechnology, "9"),
                Node::new("b", "B", NodeType::Milestone, "3"),
                Node::new("c", "C", NodeType::ReactorConcept, "6"),
            ],
            edges: vec![Edge::single("a", "b"), Edge::single("b", "c")],
        })
        .unwrap()
    }

    #[test]
    fn test_seed_from_readiness() {
        let g = chain();
        let snap = Snapshot::seed(&g, &ReadinessModel::default());
        assert!(snap[0].is_complete);
        assert_eq!(snap[0].prob_of_success, 1.0);
        assert!(!snap[1].is_complete);
        assert!((snap[1].time_remaining - 15.0).abs() < 1e-12);
        assert!((snap[1].prob_of_success - 0.30).abs() < 1e-12);
    }

    #[test]
    fn test_advance_reaches_certainty_on_completion() {
        let g = chain();
        let mut snap = Snapshot::seed(&g, &ReadinessModel::default());
        let state = snap.get_mut(1);
        let rate = state.risk_reduction_per_year();
        assert!((rate - 0.7 / 15.0).abs() < 1e-12);
        for _ in 0..14 {
            state.advance_one_year();
            assert!(!state.is_complete);
        }
        state.advance_one_year();
        assert!(state.is_complete);
        assert_eq!(state.time_remaining, 0.0);
        assert_eq!(state.prob_of_success, 1.0);
    }

    #[test]
    fn test_fractional_time_floors_at_zero() {
        let mut state = NodeState {
            initial_time: 7.5,
            initial_probability: 0.5,
            time_remaining: 0.5,
            prob_of_success: 0.9,
            is_complete: false,
            deployment_year: None,
            deployed_capacity_mw: 0.0,
        };
        state.advance_one_year();
        assert_eq!(state.time_remaining, 0.0);
        assert!(state.is_complete);
        assert_eq!(state.prob_of_success, 1.0);
    }

    #[test]
    fn test_completed_is_terminal() {
        let mut state = NodeState {
            initial_time: 1.0,
            initial_probability: 0.5,
            time_remaining: 0.0,
            prob_of_success: 1.0,
            is_complete: true,
            deployment_year: None,
            deployed_capacity_mw: 0.0,
        };
        let before = state;
        state.advance_one_year();
        assert_eq!(state, before);
    }

    #[test]
    fn test_statuses_use_start_of_year_flags() {
        let g = TechGraph::new(GraphData {
            nodes: vec![
                // b is declared before its prerequisite on purpose
                Node::new("b", "B", NodeType::Milestone, "5"),
                Node::new("a", "A", NodeType::Milestone, "8.9"),
            ],
            edges: vec![Edge::single("a", "b")],
        })
        .unwrap();
        let mut snap = Snapshot::seed(&g, &ReadinessModel::default());

        let year1 = snap.advance_year(&g);
        assert_eq!(year1[1], TechStatus::Active);
        assert_eq!(year1[0], TechStatus::Pending);
        assert!(snap[1].is_complete);

        let year2 = snap.advance_year(&g);
        assert_eq!(year2[1], TechStatus::Completed);
        assert_eq!(year2[0], TechStatus::Active);
    }

    #[test]
    fn test_and_semantics_for_prerequisites() {
        let g = TechGraph::new(GraphData {
            nodes: vec![
                Node::new("done", "Done", NodeType::EnablingTechnology, "9"),
                Node::new("busy", "Busy", NodeType::EnablingTechnology, "2"),
                Node::new("gated", "Gated", NodeType::Milestone, "5"),
            ],
            edges: vec![Edge::single("done", "gated"), Edge::single("busy", "gated")],
        })
        .unwrap();
        let snap = Snapshot::seed(&g, &ReadinessModel::default());
        assert_eq!(snap.status_of(&g, 2), TechStatus::Pending);
    }

    #[test]
    fn test_concepts_never_advance() {
        let g = chain();
        let mut snap = Snapshot::seed(&g, &ReadinessModel::default());
        let before = snap[2];
        for _ in 0..30 {
            snap.advance_year(&g);
        }
        assert_eq!(snap[2], before);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(TechStatus::Pending.to_string(), "Pending");
        assert_eq!(TechStatus::Active.to_string(), "Active");
        assert_eq!(TechStatus::Completed.to_string(), "Completed");
    }
}
