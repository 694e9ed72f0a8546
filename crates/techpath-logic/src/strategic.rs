//! Strategic forward simulator: long-horizon value of a one-time
//! acceleration.
//!
//! Unlike the marginal scheduler, this simulates actual deployment events:
//! a reactor concept deploys the first year its prerequisites are all
//! complete and its critical-path probability clears the deployment
//! threshold, then produces energy every year after. Two trajectories are
//! run from the same seed, one with the candidate technology given a single
//! extra year of work up front, and their discounted cumulative output is
//! compared.

use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::critical_path::CriticalPathEvaluator;
use crate::energy::{discount_factor, plant_output_mwh};
use crate::error::{SimError, SimResult};
use crate::graph::TechGraph;
use crate::scheduler::YearlyScheduler;
use crate::state::Snapshot;

/// Value of accelerating one technology once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentOption {
    /// Node id of the accelerated technology.
    pub investment_tech: String,
    pub investment_year: i32,
    /// Discounted cumulative output without the investment (TWh).
    pub baseline_twh: f64,
    /// Discounted cumulative output with the investment (TWh).
    pub accelerated_twh: f64,
    pub cumulative_impact_twh: f64,
    /// `accelerated / baseline`, or +inf when the baseline produces nothing.
    pub roi_multiple: f64,
}

/// One simulated year of a forward trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearOutcome {
    pub year: i32,
    /// Undiscounted production this year (TWh).
    pub energy_twh: f64,
    /// Ids of concepts deploying this year.
    pub newly_deployed: Vec<String>,
    /// Concepts operating (deployed this year or earlier).
    pub deployed_count: usize,
}

/// A full forward run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub start_year: i32,
    pub years: Vec<YearOutcome>,
}

impl Trajectory {
    /// Production discounted back to the start year (TWh).
    pub fn discounted_twh(&self, config: &SimulationConfig) -> f64 {
        self.years
            .iter()
            .map(|y| y.energy_twh * discount_factor(config, f64::from(y.year - self.start_year)))
            .sum()
    }

    /// Year a concept first deployed, if it did.
    pub fn deployment_year_of(&self, id: &str) -> Option<i32> {
        self.years
            .iter()
            .find(|y| y.newly_deployed.iter().any(|d| d == id))
            .map(|y| y.year)
    }
}

/// Long-horizon investment evaluator over one graph and configuration.
pub struct StrategicSimulator<'a> {
    graph: &'a TechGraph,
    config: &'a SimulationConfig,
}

impl<'a> StrategicSimulator<'a> {
    pub fn new(graph: &'a TechGraph, config: &'a SimulationConfig) -> Self {
        Self { graph, config }
    }

    /// Simulate `years_ahead` years from `start_year`, optionally giving
    /// node `accelerated` one extra year of work before the first year.
    /// An out-of-range index is logged and ignored.
    pub fn forward_simulation(
        &self,
        start_year: i32,
        years_ahead: u32,
        accelerated: Option<usize>,
    ) -> Trajectory {
        let graph = self.graph;
        let mut snapshot = Snapshot::seed(graph, &self.config.readiness);
        match accelerated {
            Some(idx) if idx < snapshot.len() => snapshot.get_mut(idx).advance_one_year(),
            Some(idx) => log::warn!("Ignoring acceleration of out-of-range node {}", idx),
            None => {}
        }

        let mut years = Vec::with_capacity(years_ahead as usize);
        for offset in 0..years_ahead {
            let year = start_year + offset as i32;
            snapshot.advance_year(graph);
            let newly = self.deploy_ready_concepts(&mut snapshot, year);

            let mut energy_mwh = 0.0;
            let mut deployed_count = 0;
            for c in graph.concept_indices() {
                let state = &snapshot[c];
                if state.deployment_year.is_some() {
                    deployed_count += 1;
                }
                energy_mwh +=
                    plant_output_mwh(self.config, state.deployed_capacity_mw, state.deployment_year, year);
            }

            years.push(YearOutcome {
                year,
                energy_twh: energy_mwh / self.config.mwh_per_twh,
                newly_deployed: newly
                    .into_iter()
                    .map(|i| graph.node(i).id.clone())
                    .collect(),
                deployed_count,
            });
        }

        Trajectory { start_year, years }
    }

    /// Mark every concept that can deploy in `year`. Deployment is permanent.
    fn deploy_ready_concepts(&self, snapshot: &mut Snapshot, year: i32) -> Vec<usize> {
        let graph = self.graph;
        let ready: Vec<usize> = {
            let mut evaluator = CriticalPathEvaluator::new(graph, snapshot);
            graph
                .concept_indices()
                .filter(|&c| snapshot[c].deployment_year.is_none())
                .filter(|&c| snapshot.prerequisites_complete(graph, c))
                .filter(|&c| {
                    evaluator.evaluate(c).probability > self.config.deployment_probability_threshold
                })
                .collect()
        };

        for &c in &ready {
            let state = snapshot.get_mut(c);
            state.deployment_year = Some(year);
            state.deployed_capacity_mw = self.config.plant_capacity_mw;
            log::debug!("{} deploys in {}", graph.node(c).id, year);
        }
        ready
    }

    /// Compare baseline and accelerated trajectories for one technology.
    pub fn calculate_cumulative_impact(
        &self,
        tech_id: &str,
        investment_year: i32,
        years_ahead: u32,
    ) -> SimResult<InvestmentOption> {
        let idx = self
            .graph
            .index_of(tech_id)
            .ok_or_else(|| SimError::UnknownNode(tech_id.to_string()))?;
        if !self.graph.node(idx).node_type.is_acceleratable() {
            return Err(SimError::NotAcceleratable(tech_id.to_string()));
        }

        let baseline = self
            .forward_simulation(investment_year, years_ahead, None)
            .discounted_twh(self.config);
        let accelerated = self
            .forward_simulation(investment_year, years_ahead, Some(idx))
            .discounted_twh(self.config);

        Ok(InvestmentOption {
            investment_tech: tech_id.to_string(),
            investment_year,
            baseline_twh: baseline,
            accelerated_twh: accelerated,
            cumulative_impact_twh: accelerated - baseline,
            roi_multiple: if baseline > 0.0 {
                accelerated / baseline
            } else {
                f64::INFINITY
            },
        })
    }

    /// Technologies showing positive marginal impact in `current_year`
    /// according to a one-year scheduler run starting that year.
    pub fn truly_active_technologies(&self, current_year: i32) -> Vec<usize> {
        YearlyScheduler::new(self.graph, self.config)
            .simulate(current_year, 1)
            .impactful_in(current_year)
    }

    /// Rank every truly active technology by cumulative impact.
    pub fn find_optimal_long_term_investment(
        &self,
        current_year: i32,
        years_ahead: u32,
    ) -> Vec<InvestmentOption> {
        let candidates: Vec<&str> = self
            .truly_active_technologies(current_year)
            .into_iter()
            .map(|i| self.graph.node(i).id.as_str())
            .collect();
        self.find_optimal_long_term_investment_among(current_year, years_ahead, &candidates)
    }

    /// Rank an explicit candidate list by cumulative impact.
    ///
    /// Positive-impact options come first, sorted descending; options at or
    /// below the noise floor follow. Candidates that fail to evaluate are
    /// logged and skipped.
    pub fn find_optimal_long_term_investment_among<S: AsRef<str>>(
        &self,
        current_year: i32,
        years_ahead: u32,
        candidates: &[S],
    ) -> Vec<InvestmentOption> {
        let mut options = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let id = candidate.as_ref();
            match self.calculate_cumulative_impact(id, current_year, years_ahead) {
                Ok(option) => options.push(option),
                Err(e) => log::warn!("Skipping candidate {}: {}", id, e),
            }
        }

        options.sort_by(|a, b| b.cumulative_impact_twh.total_cmp(&a.cumulative_impact_twh));
        let floor = self.config.impact_noise_floor_twh;
        let (mut positive, zero): (Vec<_>, Vec<_>) = options
            .into_iter()
            .partition(|o| o.cumulative_impact_twh > floor);

        log::info!(
            "Ranked {} investment options for {} ({} with positive impact)",
            positive.len() + zero.len(),
            current_year,
            positive.len()
        );
        positive.extend(zero);
        positive
    }
}
