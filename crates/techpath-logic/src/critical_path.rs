//! Critical-path evaluation over the prerequisite graph.
//!
//! For a node `n`:
//!
//! ```text
//! time(n) = time_remaining(n) + max(time(p) for p in prereqs(n))
//! prob(n) = prob_of_success(n) * Π prob(p)
//! ```
//!
//! Prerequisites run in parallel, so the slowest chain gates the node, while
//! every chain must succeed. A node met again while it is still on the
//! current walk is a cycle and contributes [`PathEstimate::UNREACHABLE`].
//!
//! The walk is an explicit depth-first worklist (no recursion), and both the
//! memo cache and the on-path set live in a `CriticalPathEvaluator` that
//! borrows exactly one `Snapshot`. A new snapshot needs a new evaluator, so
//! cached values can never leak between baseline and counterfactual runs.

use crate::graph::TechGraph;
use crate::state::Snapshot;

/// Cumulative time-to-completion (years) and joint success probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathEstimate {
    pub time: f64,
    pub probability: f64,
}

impl PathEstimate {
    /// Sentinel for a node that cannot currently be completed.
    pub const UNREACHABLE: Self = Self {
        time: f64::INFINITY,
        probability: 0.0,
    };

    pub fn is_reachable(&self) -> bool {
        self.time.is_finite()
    }
}

/// One pending node on the worklist.
struct Frame {
    node: usize,
    next_prereq: usize,
    max_time: f64,
    joint_probability: f64,
}

impl Frame {
    fn new(node: usize) -> Self {
        Self {
            node,
            next_prereq: 0,
            max_time: 0.0,
            joint_probability: 1.0,
        }
    }

    fn fold(&mut self, prereq: PathEstimate) {
        self.max_time = self.max_time.max(prereq.time);
        self.joint_probability *= prereq.probability;
    }
}

/// Memoized evaluator bound to a single snapshot.
pub struct CriticalPathEvaluator<'a> {
    graph: &'a TechGraph,
    snapshot: &'a Snapshot,
    cache: Vec<Option<PathEstimate>>,
    on_path: Vec<bool>,
}

impl<'a> CriticalPathEvaluator<'a> {
    /// `snapshot` must hold one state per node of `graph`.
    pub fn new(graph: &'a TechGraph, snapshot: &'a Snapshot) -> Self {
        debug_assert_eq!(snapshot.len(), graph.len(), "snapshot does not match graph");
        Self {
            graph,
            snapshot,
            cache: vec![None; graph.len()],
            on_path: vec![false; graph.len()],
        }
    }

    /// Critical path of node `target`.
    pub fn evaluate(&mut self, target: usize) -> PathEstimate {
        if let Some(hit) = self.cache[target] {
            return hit;
        }

        let mut stack = vec![Frame::new(target)];
        self.on_path[target] = true;
        let mut returned: Option<PathEstimate> = None;

        while let Some(frame) = stack.last_mut() {
            if let Some(result) = returned.take() {
                frame.fold(result);
            }

            let prereqs = self.graph.prerequisite_indices(frame.node);
            if frame.next_prereq < prereqs.len() {
                let child = prereqs[frame.next_prereq];
                frame.next_prereq += 1;

                if self.on_path[child] {
                    returned = Some(PathEstimate::UNREACHABLE);
                } else if let Some(hit) = self.cache[child] {
                    returned = Some(hit);
                } else {
                    self.on_path[child] = true;
                    stack.push(Frame::new(child));
                }
                continue;
            }

            // All prerequisites folded in
            let state = &self.snapshot[frame.node];
            let result = if prereqs.is_empty() {
                PathEstimate {
                    time: state.time_remaining,
                    probability: state.prob_of_success,
                }
            } else {
                PathEstimate {
                    time: state.time_remaining + frame.max_time,
                    probability: state.prob_of_success * frame.joint_probability,
                }
            };

            let node = frame.node;
            stack.pop();
            self.on_path[node] = false;
            self.cache[node] = Some(result);
            returned = Some(result);
        }

        returned.unwrap_or(PathEstimate::UNREACHABLE)
    }

    /// Id-based form of [`Self::evaluate`]; `None` for unknown ids.
    pub fn evaluate_id(&mut self, id: &str) -> Option<PathEstimate> {
        self.graph.index_of(id).map(|i| self.evaluate(i))
    }
}

/// One-shot critical path with a private cache.
pub fn critical_path(graph: &TechGraph, snapshot: &Snapshot, id: &str) -> Option<PathEstimate> {
    CriticalPathEvaluator::new(graph, snapshot).evaluate_id(id)
}
