//! Year-by-year scheduler with per-technology marginal impact.
//!
//! Each simulated year:
//!
//! 1. Statuses are fixed from start-of-year completion flags and every
//!    active milestone / enabling technology does one year of work.
//! 2. For every technology still active and unfinished, the scheduler
//!    clones the snapshot, gives that one technology an extra year of work,
//!    and compares expected discounted output of the reactor concepts it can
//!    reach. The difference, in TWh, is its marginal impact for the year.
//!
//! Impacts at or below the configured noise floor are not recorded.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::critical_path::CriticalPathEvaluator;
use crate::energy::discounted_lifetime_mwh;
use crate::graph::TechGraph;
use crate::state::{Snapshot, TechStatus};

/// Label-keyed outputs for dashboard consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationTables {
    /// label → year → marginal impact (TWh). Sparse.
    pub impact: BTreeMap<String, BTreeMap<i32, f64>>,
    /// label → year → status. Dense for every acceleratable technology.
    pub status: BTreeMap<String, BTreeMap<i32, TechStatus>>,
}

/// Index-keyed result of one scheduler run.
#[derive(Debug, Clone)]
pub struct YearlyRun {
    pub start_year: i32,
    pub years: u32,
    /// Per node index; empty for reactor concepts.
    pub impact: Vec<BTreeMap<i32, f64>>,
    /// Per node index; empty for reactor concepts.
    pub status: Vec<BTreeMap<i32, TechStatus>>,
}

impl YearlyRun {
    /// Node indices with a recorded impact in `year`.
    pub fn impactful_in(&self, year: i32) -> Vec<usize> {
        self.impact
            .iter()
            .enumerate()
            .filter(|(_, by_year)| by_year.contains_key(&year))
            .map(|(i, _)| i)
            .collect()
    }

    /// Re-key by node label.
    pub fn to_tables(&self, graph: &TechGraph) -> SimulationTables {
        let mut tables = SimulationTables::default();
        for idx in graph.acceleratable_indices() {
            let label = &graph.node(idx).label;
            tables
                .impact
                .entry(label.clone())
                .or_default()
                .extend(self.impact[idx].iter().map(|(&y, &v)| (y, v)));
            tables
                .status
                .entry(label.clone())
                .or_default()
                .extend(self.status[idx].iter().map(|(&y, &s)| (y, s)));
        }
        tables
    }
}

/// Marginal-impact scheduler over one graph and configuration.
pub struct YearlyScheduler<'a> {
    graph: &'a TechGraph,
    config: &'a SimulationConfig,
}

impl<'a> YearlyScheduler<'a> {
    pub fn new(graph: &'a TechGraph, config: &'a SimulationConfig) -> Self {
        Self { graph, config }
    }

    /// Run `years` years from the configured start year.
    pub fn run_simulation(&self, years: u32) -> SimulationTables {
        self.run_simulation_from(self.config.start_year, years)
    }

    /// Run `years` years starting at `start_year`.
    pub fn run_simulation_from(&self, start_year: i32, years: u32) -> SimulationTables {
        self.simulate(start_year, years).to_tables(self.graph)
    }

    /// Full index-keyed run on a freshly seeded snapshot.
    pub fn simulate(&self, start_year: i32, years: u32) -> YearlyRun {
        let graph = self.graph;
        let mut snapshot = Snapshot::seed(graph, &self.config.readiness);

        let affected: Vec<Vec<usize>> = (0..graph.len())
            .map(|i| {
                if graph.node(i).node_type.is_acceleratable() {
                    graph.downstream_concepts(i)
                } else {
                    Vec::new()
                }
            })
            .collect();
        let isolated = graph
            .acceleratable_indices()
            .filter(|&i| affected[i].is_empty())
            .count();
        if isolated > 0 {
            log::debug!("{} technologies reach no reactor concept and carry no impact", isolated);
        }

        let mut run = YearlyRun {
            start_year,
            years,
            impact: vec![BTreeMap::new(); graph.len()],
            status: vec![BTreeMap::new(); graph.len()],
        };

        for offset in 0..years {
            let year = start_year + offset as i32;
            let statuses = snapshot.advance_year(graph);

            for idx in graph.acceleratable_indices() {
                run.status[idx].insert(year, statuses[idx]);
            }

            for idx in graph.acceleratable_indices() {
                if statuses[idx] != TechStatus::Active || snapshot[idx].is_complete {
                    continue;
                }
                let concepts = &affected[idx];
                if concepts.is_empty() {
                    continue;
                }
                let impact = self.marginal_impact_twh(&snapshot, idx, concepts, year);
                if impact > self.config.impact_noise_floor_twh {
                    run.impact[idx].insert(year, impact);
                }
            }
        }

        let entries: usize = run.impact.iter().map(BTreeMap::len).sum();
        log::info!(
            "Scheduler ran {} years from {}: {} impact entries",
            years, start_year, entries
        );
        run
    }

    /// Expected discounted output (MWh) of `concepts` given `snapshot`.
    ///
    /// Each concept contributes its discounted lifetime output if deployed
    /// at the end of its critical path, weighted by the path's probability.
    pub fn pathway_mwh(&self, snapshot: &Snapshot, concepts: &[usize], year: i32) -> f64 {
        let mut evaluator = CriticalPathEvaluator::new(self.graph, snapshot);
        let now = f64::from(year);
        concepts
            .iter()
            .map(|&c| {
                let path = evaluator.evaluate(c);
                discounted_lifetime_mwh(self.config, now + path.time, now) * path.probability
            })
            .sum()
    }

    /// Output gained (TWh) by giving `node` one extra year of work on a
    /// private copy of `snapshot`.
    pub fn marginal_impact_twh(
        &self,
        snapshot: &Snapshot,
        node: usize,
        concepts: &[usize],
        year: i32,
    ) -> f64 {
        let baseline = self.pathway_mwh(snapshot, concepts, year);

        let mut accelerated = snapshot.clone();
        accelerated.get_mut(node).advance_one_year();
        let boosted = self.pathway_mwh(&accelerated, concepts, year);

        (boosted - baseline) / self.config.mwh_per_twh
    }
}

/// Headline numbers for an impact table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactSummary {
    /// Technologies tracked in the table.
    pub total_techs: usize,
    /// Technologies with a positive impact in any year.
    pub active_techs: usize,
    /// Largest single-year impact (TWh).
    pub max_impact_twh: f64,
    /// Technologies with a positive impact in the given year.
    pub current_opportunities: usize,
}

impl ImpactSummary {
    pub fn from_tables(tables: &SimulationTables, year: i32) -> Self {
        let mut summary = Self {
            total_techs: tables.impact.len(),
            ..Self::default()
        };
        for by_year in tables.impact.values() {
            if by_year.values().any(|&v| v > 0.0) {
                summary.active_techs += 1;
            }
            if by_year.get(&year).is_some_and(|&v| v > 0.0) {
                summary.current_opportunities += 1;
            }
            for &v in by_year.values() {
                summary.max_impact_twh = summary.max_impact_twh.max(v);
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, GraphData, Node, NodeType};

    /// A (ready) → B (readiness 3) → concept C
    fn ready_chain() -> TechGraph {
        TechGraph::new(GraphData {
            nodes: vec![
                Node::new("a", "Tech A", NodeType::EnablingTechnology, "9"),
                Node::new("b", "Milestone B", NodeType::Milestone, "3"),
                Node::new("c", "Concept C", NodeType::ReactorConcept, "6"),
            ],
            edges: vec![Edge::single("a", "b"), Edge::single("b", "c")],
        })
        .unwrap()
    }

    #[test]
    fn test_status_table_is_dense() {
        let g = ready_chain();
        let config = SimulationConfig::default();
        let tables = YearlyScheduler::new(&g, &config).run_simulation(5);
        assert_eq!(tables.status.len(), 2);
        for by_year in tables.status.values() {
            assert_eq!(by_year.len(), 5);
            assert!(by_year.keys().copied().eq(2025..2030));
        }
        assert!(!tables.status.contains_key("Concept C"));
    }

    #[test]
    fn test_active_milestone_gets_impact() {
        let g = ready_chain();
        let config = SimulationConfig::default();
        let tables = YearlyScheduler::new(&g, &config).run_simulation(5);
        let b_status = &tables.status["Milestone B"];
        let b_impact = &tables.impact["Milestone B"];
        for year in 2025..2030 {
            assert_eq!(b_status[&year], TechStatus::Active);
            assert!(b_impact[&year] > config.impact_noise_floor_twh);
        }
        // Completed technologies have nothing left to accelerate
        assert_eq!(tables.status["Tech A"][&2025], TechStatus::Completed);
        assert!(tables.impact["Tech A"].is_empty());
    }

    #[test]
    fn test_marginal_impact_matches_formula() {
        let g = ready_chain();
        let config = SimulationConfig::default();
        let scheduler = YearlyScheduler::new(&g, &config);
        let mut snap = Snapshot::seed(&g, &config.readiness);
        snap.advance_year(&g);

        let b = &snap[1];
        let c = &snap[2];
        let base_time = c.time_remaining + b.time_remaining;
        let base_prob = c.prob_of_success * b.prob_of_success;
        let mut boosted_b = *b;
        boosted_b.advance_one_year();
        let acc_time = c.time_remaining + boosted_b.time_remaining;
        let acc_prob = c.prob_of_success * boosted_b.prob_of_success;

        let now = 2025.0;
        let expected = (discounted_lifetime_mwh(&config, now + acc_time, now) * acc_prob
            - discounted_lifetime_mwh(&config, now + base_time, now) * base_prob)
            / config.mwh_per_twh;

        let got = scheduler.marginal_impact_twh(&snap, 1, &[2], 2025);
        assert!((got - expected).abs() < 1e-9);
        assert!(got > 0.0);
    }

    #[test]
    fn test_counterfactual_leaves_snapshot_untouched() {
        let g = ready_chain();
        let config = SimulationConfig::default();
        let scheduler = YearlyScheduler::new(&g, &config);
        let snap = Snapshot::seed(&g, &config.readiness);
        let before = snap.clone();
        scheduler.marginal_impact_twh(&snap, 1, &[2], 2025);
        assert_eq!(snap, before);
    }

    #[test]
    fn test_technology_without_concepts_has_no_impact() {
        let g = TechGraph::new(GraphData {
            nodes: vec![
                Node::new("lonely", "Lonely", NodeType::EnablingTechnology, "4"),
                Node::new("c", "Concept", NodeType::ReactorConcept, "6"),
            ],
            edges: vec![],
        })
        .unwrap();
        let config = SimulationConfig::default();
        let tables = YearlyScheduler::new(&g, &config).run_simulation(3);
        assert!(tables.impact["Lonely"].is_empty());
        assert_eq!(tables.status["Lonely"].len(), 3);
    }

    #[test]
    fn test_noise_floor_is_respected() {
        let g = ready_chain();
        let config = SimulationConfig {
            impact_noise_floor_twh: 1.0e9,
            ..SimulationConfig::default()
        };
        let tables = YearlyScheduler::new(&g, &config).run_simulation(5);
        assert!(tables.impact.values().all(BTreeMap::is_empty));
    }

    #[test]
    fn test_summary() {
        let g = ready_chain();
        let config = SimulationConfig::default();
        let tables = YearlyScheduler::new(&g, &config).run_simulation(3);
        let summary = ImpactSummary::from_tables(&tables, 2025);
        assert_eq!(summary.total_techs, 2);
        assert_eq!(summary.active_techs, 1);
        assert_eq!(summary.current_opportunities, 1);
        let max = tables.impact["Milestone B"].values().cloned().fold(0.0, f64::max);
        assert_eq!(summary.max_impact_twh, max);
    }

    #[test]
    fn test_custom_start_year() {
        let g = ready_chain();
        let config = SimulationConfig::default();
        let run = YearlyScheduler::new(&g, &config).simulate(2040, 1);
        assert_eq!(run.impactful_in(2040), vec![1]);
        assert!(run.impactful_in(2025).is_empty());
    }
}
