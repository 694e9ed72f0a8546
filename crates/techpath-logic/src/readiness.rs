//! Readiness model. The only place readiness metadata becomes simulation
//! parameters.
//!
//! A node's qualitative readiness level (`"5"`, `"4-5"`, `"3-4 (Production)"`)
//! maps to an initial success probability through a lookup table, and to an
//! initial time-to-completion through a linear years-per-level rule.
//! Unrecognised input falls back to documented defaults; nothing here fails.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::Node;

/// Readiness → probability table and time-estimate constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessModel {
    /// Normalised readiness key → initial success probability.
    pub probabilities: BTreeMap<String, f64>,
    /// Probability for readiness strings missing from the table.
    pub default_probability: f64,
    /// Readiness level at which no development work remains.
    pub max_level: f64,
    /// Years of development per readiness level still to climb.
    pub years_per_level: f64,
    /// Flat estimate for nodes carrying a projected-readiness annotation.
    pub projected_estimate_years: f64,
    /// Estimate used when the readiness string has no leading number.
    pub unparseable_estimate_years: f64,
    /// Floor for any estimate of a node that still needs work.
    pub min_estimate_years: f64,
}

impl Default for ReadinessModel {
    fn default() -> Self {
        let probabilities = [
            ("1", 0.10),
            ("2", 0.20),
            ("2-3", 0.25),
            ("3", 0.30),
            ("3-4", 0.40),
            ("4", 0.50),
            ("4-5", 0.60),
            ("5", 0.70),
            ("5-6", 0.75),
            ("6", 0.80),
            ("6-7", 0.85),
            ("7", 0.90),
            ("7-8", 0.95),
            ("8", 0.98),
            ("9", 1.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            probabilities,
            default_probability: 0.6,
            max_level: 9.0,
            years_per_level: 2.5,
            projected_estimate_years: 7.5,
            unparseable_estimate_years: 5.0,
            min_estimate_years: 0.1,
        }
    }
}

/// Reduce a free-form readiness string to a table key.
///
/// `"4-5 (Tokamaks); 2-3 (Stellarators)"` → `"4-5"`, `"3;x"` → `"3"`.
pub fn normalize_level(raw: &str) -> &str {
    let head = raw.split(' ').next().unwrap_or(raw);
    head.split(';').next().unwrap_or(head).trim()
}

/// Leading numeric readiness value: the text before the first `-`, then
/// before the first space. `"4-5"` → 4.0, `"7-9 (LWRs)"` → 7.0.
pub fn leading_level(raw: &str) -> Option<f64> {
    let head = raw.split('-').next().unwrap_or(raw);
    let head = head.split(' ').next().unwrap_or(head);
    head.trim().parse::<f64>().ok()
}

impl ReadinessModel {
    /// Initial success probability in `[0, 1]`.
    pub fn initial_probability(&self, node: &Node) -> f64 {
        let p = node
            .readiness_level
            .as_deref()
            .and_then(|raw| self.probabilities.get(normalize_level(raw)))
            .copied()
            .unwrap_or(self.default_probability);
        p.clamp(0.0, 1.0)
    }

    /// Initial years-to-completion.
    ///
    /// Returns `0.0` when no work remains (level at or above `max_level`);
    /// any positive estimate is floored at `min_estimate_years`. A node with
    /// no readiness string is estimated as level 1.
    pub fn initial_time_estimate(&self, node: &Node) -> f64 {
        if node.projected_readiness.is_some() {
            return self.projected_estimate_years;
        }

        let raw = node.readiness_level.as_deref().unwrap_or("1");
        let years = match leading_level(raw) {
            Some(level) => (self.max_level - level) * self.years_per_level,
            None => self.unparseable_estimate_years,
        };

        if years <= 0.0 {
            0.0
        } else {
            years.max(self.min_estimate_years)
        }
    }

    /// Divisor for the annual risk-reduction rate. Never zero.
    pub fn risk_horizon(&self, initial_time: f64) -> f64 {
        initial_time.max(self.min_estimate_years)
    }
}
