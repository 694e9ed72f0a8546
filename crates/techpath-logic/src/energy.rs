//! Energy accounting: discounted lifetime output and per-year production.

use crate::config::SimulationConfig;

/// Discount multiplier for energy delivered `years` after the reference year.
pub fn discount_factor(config: &SimulationConfig, years: f64) -> f64 {
    1.0 / (1.0 + config.discount_rate).powf(years)
}

/// Discounted lifetime output (MWh) of one plant first operating in
/// `deployment_year`, seen from `current_year`.
///
/// Operating years at or before `current_year` earn nothing. An infinite
/// deployment year (unreachable concept) yields zero.
pub fn discounted_lifetime_mwh(
    config: &SimulationConfig,
    deployment_year: f64,
    current_year: f64,
) -> f64 {
    if !deployment_year.is_finite() {
        return 0.0;
    }
    let annual = config.annual_plant_mwh();
    (0..config.operating_lifetime_years)
        .map(|i| deployment_year + f64::from(i))
        .filter(|&year| year > current_year)
        .map(|year| annual * discount_factor(config, year - current_year))
        .sum()
}

/// Output (MWh) of a plant of `capacity_mw` during `year`.
///
/// Nothing before deployment, the ramp-up fraction in the deployment year,
/// full output afterwards.
pub fn plant_output_mwh(
    config: &SimulationConfig,
    capacity_mw: f64,
    deployment_year: Option<i32>,
    year: i32,
) -> f64 {
    let Some(deployed) = deployment_year else {
        return 0.0;
    };
    if deployed > year {
        return 0.0;
    }
    let full = capacity_mw * config.capacity_factor * 24.0 * 365.0;
    if deployed == year {
        full * config.first_year_ramp_up
    } else {
        full
    }
}
