//! Simulation configuration: every constant the simulators read.
//!
//! A `SimulationConfig` is built once and handed to a simulator by
//! reference; nothing in the crate reads global state, so tests can run
//! several configurations side by side.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::readiness::ReadinessModel;

/// Economic, plant and scheduling constants for one simulation setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Calendar year treated as "now". Energy at or before it earns nothing.
    pub start_year: i32,
    /// Annual discount rate applied to future energy.
    pub discount_rate: f64,
    /// Nameplate capacity of one deployed plant (MW).
    pub plant_capacity_mw: f64,
    /// Average fraction of nameplate output actually delivered.
    pub capacity_factor: f64,
    /// Years a deployed plant operates.
    pub operating_lifetime_years: u32,
    /// Unit conversion for reported results.
    pub mwh_per_twh: f64,
    /// Marginal impacts at or below this (TWh) are not recorded.
    pub impact_noise_floor_twh: f64,
    /// A concept deploys once its path probability is strictly above this.
    pub deployment_probability_threshold: f64,
    /// Fraction of full output produced in a plant's first year.
    pub first_year_ramp_up: f64,
    /// Default horizon for the strategic simulator.
    pub default_years_ahead: u32,
    pub readiness: ReadinessModel,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_year: 2025,
            discount_rate: 0.05,
            plant_capacity_mw: 1000.0,
            capacity_factor: 0.90,
            operating_lifetime_years: 60,
            mwh_per_twh: 1_000_000.0,
            impact_noise_floor_twh: 0.001,
            deployment_probability_threshold: 0.70,
            first_year_ramp_up: 0.5,
            default_years_ahead: 20,
            readiness: ReadinessModel::default(),
        }
    }
}

impl SimulationConfig {
    /// Reject values that would make the simulation meaningless.
    pub fn validate(&self) -> SimResult<()> {
        fn unit(name: &str, v: f64) -> SimResult<()> {
            if v.is_finite() && (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(SimError::InvalidConfig(format!("{} must be in [0, 1], got {}", name, v)))
            }
        }

        if !(self.discount_rate.is_finite() && self.discount_rate > -1.0) {
            return Err(SimError::InvalidConfig(format!(
                "discount_rate must be finite and > -1, got {}",
                self.discount_rate
            )));
        }
        if !(self.plant_capacity_mw.is_finite() && self.plant_capacity_mw >= 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "plant_capacity_mw must be non-negative, got {}",
                self.plant_capacity_mw
            )));
        }
        if !(self.mwh_per_twh.is_finite() && self.mwh_per_twh > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "mwh_per_twh must be positive, got {}",
                self.mwh_per_twh
            )));
        }
        if self.capacity_factor <= 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "capacity_factor must be in (0, 1], got {}",
                self.capacity_factor
            )));
        }
        unit("capacity_factor", self.capacity_factor)?;
        unit("deployment_probability_threshold", self.deployment_probability_threshold)?;
        unit("first_year_ramp_up", self.first_year_ramp_up)?;
        unit("readiness.default_probability", self.readiness.default_probability)?;
        for (level, &p) in &self.readiness.probabilities {
            unit(&format!("readiness.probabilities[{}]", level), p)?;
        }
        if !(self.readiness.min_estimate_years.is_finite() && self.readiness.min_estimate_years > 0.0)
        {
            return Err(SimError::InvalidConfig(format!(
                "readiness.min_estimate_years must be positive, got {}",
                self.readiness.min_estimate_years
            )));
        }
        Ok(())
    }

    /// Energy from one plant over a full year at rated capacity factor (MWh).
    pub fn annual_plant_mwh(&self) -> f64 {
        self.plant_capacity_mw * self.capacity_factor * 24.0 * 365.0
    }

    /// Same as [`Self::annual_plant_mwh`] in TWh.
    pub fn annual_plant_twh(&self) -> f64 {
        self.annual_plant_mwh() / self.mwh_per_twh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_annual_output_of_reference_plant() {
        let config = SimulationConfig::default();
        assert!((config.annual_plant_mwh() - 7_884_000.0).abs() < 1e-6);
        assert!((config.annual_plant_twh() - 7.884).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let config = SimulationConfig {
            deployment_probability_threshold: 1.5,
            ..SimulationConfig::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_zero_capacity_factor() {
        let config = SimulationConfig {
            capacity_factor: 0.0,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_table_probability() {
        let mut config = SimulationConfig::default();
        config.readiness.probabilities.insert("10".into(), -0.2);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"start_year": 2030, "discount_rate": 0.07}"#).unwrap();
        assert_eq!(config.start_year, 2030);
        assert!((config.discount_rate - 0.07).abs() < 1e-12);
        assert_eq!(config.operating_lifetime_years, 60);
        assert_eq!(config.readiness, ReadinessModel::default());
    }
}
