//! Immutable technology dependency graph.
//!
//! `TechGraph` owns the canonical node set and pre-built prerequisite and
//! successor adjacency lists, both indexed by dense `usize` node indices so
//! simulation state can live in flat arrays. Built once in O(N + E).

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Role of a node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    /// End product whose energy output is measured.
    ReactorConcept,
    /// Demonstration or qualification step.
    Milestone,
    /// Component technology feeding milestones or concepts.
    EnablingTechnology,
}

impl NodeType {
    /// Milestones and enabling technologies advance year by year and can be
    /// accelerated.
    pub fn is_acceleratable(self) -> bool {
        matches!(self, Self::Milestone | Self::EnablingTechnology)
    }

    /// Reactor concepts are the final products.
    pub fn is_final_product(self) -> bool {
        matches!(self, Self::ReactorConcept)
    }
}

/// A canonical node. Never mutated once the graph is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Current readiness level, e.g. `"4-5"`.
    #[serde(
        default,
        rename = "trl_current",
        skip_serializing_if = "Option::is_none"
    )]
    pub readiness_level: Option<String>,
    /// Projected readiness annotation; its presence alone changes the time
    /// estimate.
    #[serde(
        default,
        rename = "trl_projected_5_10_years",
        skip_serializing_if = "Option::is_none"
    )]
    pub projected_readiness: Option<String>,
}

impl Node {
    pub fn new(id: &str, label: &str, node_type: NodeType, readiness: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            node_type,
            category: None,
            readiness_level: Some(readiness.to_string()),
            projected_readiness: None,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }
}

/// A dependency edge: `source` enables `target`, or every id in `targets`.
///
/// When `targets` is non-empty it takes precedence over `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
}

impl Edge {
    pub fn single(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: Some(target.to_string()),
            targets: Vec::new(),
        }
    }

    pub fn fan_out(source: &str, targets: &[&str]) -> Self {
        Self {
            source: source.to_string(),
            target: None,
            targets: targets.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Flattened target ids.
    pub fn target_ids(&self) -> Vec<&str> {
        if self.targets.is_empty() {
            self.target.as_deref().into_iter().collect()
        } else {
            self.targets.iter().map(String::as_str).collect()
        }
    }
}

/// Materialised dataset handed over by the host application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// Dependency graph with dense indices and both adjacency directions.
#[derive(Debug, Clone)]
pub struct TechGraph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    /// node → nodes it depends on
    prerequisites: Vec<Vec<usize>>,
    /// node → nodes that depend on it
    successors: Vec<Vec<usize>>,
}

impl TechGraph {
    /// Build the graph. Fails on empty or duplicate node ids; edges that
    /// reference unknown ids are dropped.
    pub fn new(data: GraphData) -> SimResult<Self> {
        let GraphData { nodes, edges } = data;

        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if node.id.is_empty() {
                return Err(SimError::EmptyNodeId);
            }
            if index.insert(node.id.clone(), i).is_some() {
                return Err(SimError::DuplicateNode(node.id.clone()));
            }
        }

        let mut prerequisites = vec![Vec::new(); nodes.len()];
        let mut successors = vec![Vec::new(); nodes.len()];
        let mut dropped = 0usize;

        for edge in &edges {
            let Some(&src) = index.get(&edge.source) else {
                dropped += edge.target_ids().len();
                continue;
            };
            for target in edge.target_ids() {
                match index.get(target) {
                    Some(&dst) => {
                        prerequisites[dst].push(src);
                        successors[src].push(dst);
                    }
                    None => dropped += 1,
                }
            }
        }

        if dropped > 0 {
            log::debug!("Dropped {} edge targets referencing unknown nodes", dropped);
        }

        Ok(Self {
            nodes,
            index,
            prerequisites,
            successors,
        })
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index_of(id).map(|i| &self.nodes[i])
    }

    /// Ids of the direct prerequisites of `id`, in edge order.
    pub fn prerequisites_of(&self, id: &str) -> Vec<&str> {
        self.ids_at(self.index_of(id).map(|i| self.prerequisites[i].as_slice()))
    }

    /// Ids of the direct successors of `id`, in edge order.
    pub fn successors_of(&self, id: &str) -> Vec<&str> {
        self.ids_at(self.index_of(id).map(|i| self.successors[i].as_slice()))
    }

    fn ids_at(&self, indices: Option<&[usize]>) -> Vec<&str> {
        indices
            .unwrap_or(&[])
            .iter()
            .map(|&i| self.nodes[i].id.as_str())
            .collect()
    }

    pub fn prerequisite_indices(&self, idx: usize) -> &[usize] {
        &self.prerequisites[idx]
    }

    pub fn successor_indices(&self, idx: usize) -> &[usize] {
        &self.successors[idx]
    }

    /// Indices of milestones and enabling technologies, in declaration order.
    pub fn acceleratable_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.node_type.is_acceleratable())
            .map(|(i, _)| i)
    }

    /// Indices of reactor concepts, in declaration order.
    pub fn concept_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.node_type.is_final_product())
            .map(|(i, _)| i)
    }

    /// Every reactor concept reachable forward from `start`, sorted by index.
    pub fn downstream_concepts(&self, start: usize) -> Vec<usize> {
        let mut visited = vec![false; self.nodes.len()];
        let mut queue = VecDeque::new();
        let mut concepts = Vec::new();
        visited[start] = true;
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            if self.nodes[current].node_type.is_final_product() {
                concepts.push(current);
            }
            for &next in &self.successors[current] {
                if !visited[next] {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }

        concepts.sort_unstable();
        concepts
    }

    /// Id-based form of [`TechGraph::downstream_concepts`].
    pub fn downstream_concepts_of(&self, id: &str) -> Vec<&str> {
        match self.index_of(id) {
            Some(i) => self
                .downstream_concepts(i)
                .into_iter()
                .map(|c| self.nodes[c].id.as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Number of nodes that depend directly on `idx`.
    pub fn out_degree(&self, idx: usize) -> usize {
        self.successors[idx].len()
    }

    /// Number of direct prerequisites of `idx`.
    pub fn in_degree(&self, idx: usize) -> usize {
        self.prerequisites[idx].len()
    }

    /// Nodes enabling the most others, highest out-degree first.
    pub fn most_enabling(&self, limit: usize) -> Vec<(&str, usize)> {
        self.ranked_by(limit, |i| self.out_degree(i))
    }

    /// Nodes with the most prerequisites, highest in-degree first.
    pub fn bottlenecks(&self, limit: usize) -> Vec<(&str, usize)> {
        self.ranked_by(limit, |i| self.in_degree(i))
    }

    fn ranked_by(&self, limit: usize, degree: impl Fn(usize) -> usize) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = (0..self.nodes.len())
            .map(|i| (self.nodes[i].id.as_str(), degree(i)))
            .filter(|&(_, d)| d > 0)
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(limit);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> TechGraph {
        //   tech_a   tech_b
        //       \   /
        //      ms_join
        //       /   \
        //  concept_x concept_y
        let data = GraphData {
            nodes: vec![
                Node::new("tech_a", "Tech A", NodeType::EnablingTechnology, "4"),
                Node::new("tech_b", "Tech B", NodeType::EnablingTechnology, "5"),
                Node::new("ms_join", "Join", NodeType::Milestone, "3"),
                Node::new("concept_x", "X", NodeType::ReactorConcept, "6"),
                Node::new("concept_y", "Y", NodeType::ReactorConcept, "6"),
            ],
            edges: vec![
                Edge::single("tech_a", "ms_join"),
                Edge::single("tech_b", "ms_join"),
                Edge::fan_out("ms_join", &["concept_x", "concept_y"]),
            ],
        };
        TechGraph::new(data).unwrap()
    }

    #[test]
    fn test_adjacency_both_directions() {
        let g = diamond();
        assert_eq!(g.prerequisites_of("ms_join"), vec!["tech_a", "tech_b"]);
        assert_eq!(g.successors_of("ms_join"), vec!["concept_x", "concept_y"]);
        assert!(g.prerequisites_of("tech_a").is_empty());
        assert_eq!(g.prerequisites_of("concept_y"), vec!["ms_join"]);
    }

    #[test]
    fn test_fan_out_equals_single_edges() {
        let nodes = vec![
            Node::new("s", "S", NodeType::EnablingTechnology, "4"),
            Node::new("a", "A", NodeType::Milestone, "4"),
            Node::new("b", "B", NodeType::Milestone, "4"),
        ];
        let fan = TechGraph::new(GraphData {
            nodes: nodes.clone(),
            edges: vec![Edge::fan_out("s", &["a", "b"])],
        })
        .unwrap();
        let singles = TechGraph::new(GraphData {
            nodes,
            edges: vec![Edge::single("s", "a"), Edge::single("s", "b")],
        })
        .unwrap();
        for id in ["s", "a", "b"] {
            assert_eq!(fan.successors_of(id), singles.successors_of(id));
            assert_eq!(fan.prerequisites_of(id), singles.prerequisites_of(id));
        }
    }

    #[test]
    fn test_targets_take_precedence_over_target() {
        let edge = Edge {
            source: "s".into(),
            target: Some("ignored".into()),
            targets: vec!["a".into()],
        };
        assert_eq!(edge.target_ids(), vec!["a"]);
    }

    #[test]
    fn test_unknown_references_are_dropped() {
        let data = GraphData {
            nodes: vec![Node::new("a", "A", NodeType::Milestone, "4")],
            edges: vec![
                Edge::single("ghost", "a"),
                Edge::single("a", "phantom"),
                Edge {
                    source: "a".into(),
                    target: None,
                    targets: vec![],
                },
            ],
        };
        let g = TechGraph::new(data).unwrap();
        assert!(g.prerequisites_of("a").is_empty());
        assert!(g.successors_of("a").is_empty());
        assert!(g.successors_of("ghost").is_empty());
    }

    #[test]
    fn test_duplicate_id_fails_fast() {
        let data = GraphData {
            nodes: vec![
                Node::new("a", "A", NodeType::Milestone, "4"),
                Node::new("a", "A again", NodeType::Milestone, "5"),
            ],
            edges: vec![],
        };
        assert_eq!(
            TechGraph::new(data).unwrap_err(),
            SimError::DuplicateNode("a".into())
        );
    }

    #[test]
    fn test_empty_id_fails_fast() {
        let data = GraphData {
            nodes: vec![Node::new("", "Nameless", NodeType::Milestone, "4")],
            edges: vec![],
        };
        assert_eq!(TechGraph::new(data).unwrap_err(), SimError::EmptyNodeId);
    }

    #[test]
    fn test_downstream_concepts() {
        let g = diamond();
        assert_eq!(
            g.downstream_concepts_of("tech_a"),
            vec!["concept_x", "concept_y"]
        );
        assert!(g.downstream_concepts_of("concept_x") == vec!["concept_x"]);
        assert!(g.downstream_concepts_of("missing").is_empty());
    }

    #[test]
    fn test_downstream_concepts_survive_cycles() {
        let data = GraphData {
            nodes: vec![
                Node::new("x", "X", NodeType::Milestone, "4"),
                Node::new("y", "Y", NodeType::Milestone, "4"),
                Node::new("c", "C", NodeType::ReactorConcept, "6"),
            ],
            edges: vec![
                Edge::single("x", "y"),
                Edge::single("y", "x"),
                Edge::single("y", "c"),
            ],
        };
        let g = TechGraph::new(data).unwrap();
        assert_eq!(g.downstream_concepts_of("x"), vec!["c"]);
    }

    #[test]
    fn test_degree_rankings() {
        let g = diamond();
        assert_eq!(g.most_enabling(1), vec![("ms_join", 2)]);
        assert_eq!(g.bottlenecks(5), vec![("ms_join", 2), ("concept_x", 1), ("concept_y", 1)]);
    }

    #[test]
    fn test_role_partitions() {
        let g = diamond();
        assert_eq!(g.acceleratable_indices().count(), 3);
        assert_eq!(g.concept_indices().count(), 2);
    }

    #[test]
    fn test_deserialize_dataset_shape() {
        let json = r#"{
            "nodes": [
                {"id": "a", "label": "A", "type": "EnablingTechnology", "trl_current": "4-5", "subtype": "ignored"},
                {"id": "c", "label": "C", "type": "ReactorConcept", "category": "Fusion", "trl_current": "6",
                 "trl_projected_5_10_years": "8"}
            ],
            "edges": [{"id": "e1", "source": "a", "targets": ["c"]}]
        }"#;
        let data: GraphData = serde_json::from_str(json).unwrap();
        let g = TechGraph::new(data).unwrap();
        assert_eq!(g.successors_of("a"), vec!["c"]);
        let c = g.get("c").unwrap();
        assert_eq!(c.category.as_deref(), Some("Fusion"));
        assert!(c.projected_readiness.is_some());
    }
}
