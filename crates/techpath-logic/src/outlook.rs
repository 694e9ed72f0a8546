//! Static outlook on the freshly seeded graph. No years are simulated.
//!
//! Answers "where does each pathway stand today?": projected deployment of
//! every reactor concept along its critical path with a risk tier, and a
//! priority tier for every enabling technology.

use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::critical_path::CriticalPathEvaluator;
use crate::graph::{NodeType, TechGraph};
use crate::state::Snapshot;

/// Projected deployment of one reactor concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayOutlook {
    pub concept_id: String,
    pub label: String,
    pub category: Option<String>,
    pub readiness_level: Option<String>,
    /// Critical-path years until deployment (infinite if unreachable).
    pub time_to_deploy: f64,
    pub success_probability: f64,
    /// `None` when the concept is unreachable.
    pub deployment_year: Option<f64>,
    /// Undiscounted lifetime output weighted by success probability (TWh).
    pub potential_lifetime_twh: f64,
    /// Mean of failure probability and time relative to the slowest
    /// reachable pathway in the same result set. In `[0, 1]`.
    pub risk_score: f64,
    pub risk: RiskCategory,
}

/// Combined failure and delay risk of a pathway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

impl RiskCategory {
    /// Low below 0.3, medium below 0.6, otherwise high.
    pub fn classify(risk_score: f64) -> Self {
        if risk_score < 0.3 {
            Self::Low
        } else if risk_score < 0.6 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

/// `((1 - probability) + time / max_time) / 2`. Unreachable pathways take the
/// full time penalty.
pub fn risk_score(success_probability: f64, time_to_deploy: f64, max_time: f64) -> f64 {
    let time_score = if !time_to_deploy.is_finite() {
        1.0
    } else if max_time > 0.0 {
        (time_to_deploy / max_time).min(1.0)
    } else {
        0.0
    };
    ((1.0 - success_probability) + time_score) / 2.0
}

/// Critical-path outlook for every reactor concept whose success
/// probability is at least `min_probability`, optionally restricted to
/// categories containing `category` (e.g. `"Fusion"`).
///
/// Risk scores are relative to the slowest reachable pathway that passes
/// the filters.
pub fn pathway_outlooks(
    graph: &TechGraph,
    config: &SimulationConfig,
    min_probability: f64,
    category: Option<&str>,
) -> Vec<PathwayOutlook> {
    let snapshot = Snapshot::seed(graph, &config.readiness);
    let mut evaluator = CriticalPathEvaluator::new(graph, &snapshot);
    let lifetime_twh = config.annual_plant_twh() * f64::from(config.operating_lifetime_years);

    let mut outlooks: Vec<PathwayOutlook> = graph
        .concept_indices()
        .filter(|&c| match category {
            Some(wanted) => graph
                .node(c)
                .category
                .as_deref()
                .is_some_and(|cat| cat.contains(wanted)),
            None => true,
        })
        .filter_map(|c| {
            let node = graph.node(c);
            let path = evaluator.evaluate(c);
            if path.probability < min_probability {
                return None;
            }
            Some(PathwayOutlook {
                concept_id: node.id.clone(),
                label: node.label.clone(),
                category: node.category.clone(),
                readiness_level: node.readiness_level.clone(),
                time_to_deploy: path.time,
                success_probability: path.probability,
                deployment_year: path
                    .is_reachable()
                    .then(|| f64::from(config.start_year) + path.time),
                potential_lifetime_twh: lifetime_twh * path.probability,
                risk_score: 0.0,
                risk: RiskCategory::Low,
            })
        })
        .collect();

    let max_time = outlooks
        .iter()
        .map(|o| o.time_to_deploy)
        .filter(|t| t.is_finite())
        .fold(0.0, f64::max);
    for o in &mut outlooks {
        o.risk_score = risk_score(o.success_probability, o.time_to_deploy, max_time);
        o.risk = RiskCategory::classify(o.risk_score);
    }
    outlooks
}

/// Investment priority tier for an enabling technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// High: probability > 0.7 and under 5 years. Medium: probability > 0.5
    /// and under 8 years. Otherwise low.
    pub fn classify(probability: f64, years_to_complete: f64) -> Self {
        if probability > 0.7 && years_to_complete < 5.0 {
            Self::High
        } else if probability > 0.5 && years_to_complete < 8.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Readiness snapshot of one enabling technology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnablingAssessment {
    pub tech_id: String,
    pub label: String,
    pub readiness_level: Option<String>,
    pub years_to_complete: f64,
    pub completion_year: f64,
    pub success_probability: f64,
    pub priority: Priority,
    /// Reactor concepts reachable downstream.
    pub enabled_concepts: usize,
}

/// Assess every enabling technology with probability at least
/// `min_probability`, in declaration order.
pub fn enabling_assessments(
    graph: &TechGraph,
    config: &SimulationConfig,
    min_probability: f64,
) -> Vec<EnablingAssessment> {
    let model = &config.readiness;
    graph
        .nodes()
        .iter()
        .enumerate()
        .filter(|(_, n)| n.node_type == NodeType::EnablingTechnology)
        .filter_map(|(i, node)| {
            let probability = model.initial_probability(node);
            if probability < min_probability {
                return None;
            }
            let years = model.initial_time_estimate(node);
            Some(EnablingAssessment {
                tech_id: node.id.clone(),
                label: node.label.clone(),
                readiness_level: node.readiness_level.clone(),
                years_to_complete: years,
                completion_year: f64::from(config.start_year) + years,
                success_probability: probability,
                priority: Priority::classify(probability, years),
                enabled_concepts: graph.downstream_concepts(i).len(),
            })
        })
        .collect()
}
