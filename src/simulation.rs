//! Monte Carlo uncertainty analysis over scenario parameters.
//!
//! Each trial samples the declared parameters, substitutes them into a
//! scratch copy of the scenario and recomputes the NPV. Trials are seeded
//! individually from one base seed, so sequential and parallel execution of
//! the same run produce identical results.
use crate::analysis::derive_cashflows;
use crate::constants::Constants;
use crate::economics::npv;
use crate::scenario::Scenario;
use crate::validation::validate_scenario;
use anyhow::{Result, bail, ensure};
use indexmap::IndexMap;
use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Distribution as _;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// How often the sequential loop polls the cancellation token.
const CANCEL_CHECK_INTERVAL: usize = 1024;

/// Scenario parameters that the engine knows how to perturb.
const SAMPLEABLE_PARAMETERS: [&str; 9] = [
    "diesel_price_per_liter",
    "electricity_price_per_kwh",
    "h2_price_per_kg",
    "annual_km",
    "utilization",
    "annual_operating_cost",
    "capital_cost",
    "discount_rate",
    "battery_degradation_rate",
];

/// Uncertainty attached to one scenario parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "distribution_kind", rename_all = "lowercase")]
pub enum Distribution {
    /// Gaussian around the scenario's base value
    Normal {
        /// Standard deviation, in the parameter's own units
        std: f64,
    },
    /// Uniform over an absolute interval
    Uniform {
        /// Lower bound (inclusive)
        min: f64,
        /// Upper bound (inclusive)
        max: f64,
    },
}

impl Distribution {
    fn sample(&self, base_value: f64, rng: &mut StdRng) -> f64 {
        match *self {
            Distribution::Normal { std } => rand_distr::Normal::new(base_value, std)
                .map_or(f64::NAN, |normal| normal.sample(rng)),
            Distribution::Uniform { min, max } => {
                if min == max {
                    min
                } else {
                    rng.gen_range(min..=max)
                }
            }
        }
    }

    fn validate(&self, parameter: &str) -> Result<()> {
        match *self {
            Distribution::Normal { std } => {
                ensure!(
                    std.is_finite() && std >= 0.0,
                    "Normal distribution for '{parameter}' must have a non-negative \
                     standard deviation (got {std})"
                );
            }
            Distribution::Uniform { min, max } => {
                ensure!(
                    min.is_finite() && max.is_finite() && min <= max,
                    "Uniform distribution for '{parameter}' must have min <= max \
                     (got [{min}, {max}])"
                );
            }
        }
        Ok(())
    }
}

/// Parameter name to distribution, in declaration order.
pub type UncertaintySpec = IndexMap<String, Distribution>;

/// Summary of one Monte Carlo run.
///
/// Statistics cover the finite trial results only; trials whose sampled
/// scenario was invalid or produced a non-finite NPV are counted in
/// `excluded_trial_count` and recorded as NaN in `npv_values`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    /// Scenario label
    pub scenario_name: String,
    /// Trials requested
    pub n_trials: usize,
    /// Trials excluded from the statistics
    pub excluded_trial_count: usize,
    /// Mean NPV
    pub mean: f64,
    /// Population standard deviation of NPV
    pub std: f64,
    /// Median NPV
    pub median: f64,
    /// 5th percentile NPV
    pub p05: f64,
    /// 95th percentile NPV
    pub p95: f64,
    /// Share of valid trials with a positive NPV
    pub probability_positive_npv: f64,
    /// Raw per-trial NPVs, in trial order
    pub npv_values: Vec<f64>,
}

/// Rank-interpolated percentile of an ascending-sorted slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let below = rank.floor() as usize;
    let above = rank.ceil() as usize;
    if below == above {
        return sorted[below];
    }
    let fraction = rank - below as f64;
    sorted[below] + fraction * (sorted[above] - sorted[below])
}

impl SimulationResult {
    fn from_values(scenario_name: String, values: Vec<f64>) -> SimulationResult {
        let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        finite.sort_by(f64::total_cmp);
        let excluded_trial_count = values.len() - finite.len();
        if excluded_trial_count > 0 {
            warn!(
                "{excluded_trial_count} of {} trials for '{scenario_name}' were excluded",
                values.len()
            );
        }

        if finite.is_empty() {
            return SimulationResult {
                scenario_name,
                n_trials: values.len(),
                excluded_trial_count,
                mean: f64::NAN,
                std: f64::NAN,
                median: f64::NAN,
                p05: f64::NAN,
                p95: f64::NAN,
                probability_positive_npv: 0.0,
                npv_values: values,
            };
        }

        let n = finite.len() as f64;
        let mean = finite.iter().sum::<f64>() / n;
        let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let positive = finite.iter().filter(|v| **v > 0.0).count() as f64;

        SimulationResult {
            scenario_name,
            n_trials: values.len(),
            excluded_trial_count,
            mean,
            std: variance.sqrt(),
            median: percentile(&finite, 50.0),
            p05: percentile(&finite, 5.0),
            p95: percentile(&finite, 95.0),
            probability_positive_npv: positive / n,
            npv_values: values,
        }
    }
}

/// Monte Carlo engine bound to one scenario.
pub struct MonteCarloEngine<'a> {
    scenario: &'a Scenario,
    constants: &'a Constants,
    uncertainty: UncertaintySpec,
    seed: Option<u64>,
    parallel: bool,
}

impl<'a> MonteCarloEngine<'a> {
    /// Build an engine, rejecting malformed distributions.
    ///
    /// Parameters the engine does not know how to perturb are logged and
    /// ignored rather than rejected, so a spec written for a newer schema
    /// still runs.
    pub fn new(
        scenario: &'a Scenario,
        constants: &'a Constants,
        uncertainty: UncertaintySpec,
    ) -> Result<MonteCarloEngine<'a>> {
        for (parameter, distribution) in &uncertainty {
            distribution.validate(parameter)?;
            if !SAMPLEABLE_PARAMETERS.contains(&parameter.as_str()) {
                warn!("Ignoring uncertainty on unknown parameter '{parameter}'");
            }
        }
        Ok(MonteCarloEngine {
            scenario,
            constants,
            uncertainty,
            seed: None,
            parallel: true,
        })
    }

    /// Fix the base seed for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Run trials on the current thread instead of the rayon pool.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Run `n_trials` trials and summarize the sampled NPVs.
    pub fn run(&self, n_trials: usize) -> Result<SimulationResult> {
        self.run_with_cancel(n_trials, &AtomicBool::new(false))
    }

    /// Like [`run`](Self::run), but aborts early when `cancel` becomes true.
    ///
    /// Cancellation is cooperative: the token is polled between trials (every
    /// 1024 trials in the sequential path) and a cancelled run reports how
    /// many trials had completed.
    pub fn run_with_cancel(
        &self,
        n_trials: usize,
        cancel: &AtomicBool,
    ) -> Result<SimulationResult> {
        ensure!(n_trials > 0, "Monte Carlo runs need at least one trial");

        let base_seed = self.seed.unwrap_or_else(rand::random);
        let completed = AtomicUsize::new(0);
        let trial = |index: usize| -> f64 {
            let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(index as u64));
            let mut scratch = self.scenario.clone();
            for (parameter, distribution) in &self.uncertainty {
                if let Some(base_value) = parameter_value(&scratch, parameter) {
                    let sampled = distribution.sample(base_value, &mut rng);
                    set_parameter(&mut scratch, parameter, sampled);
                }
            }
            completed.fetch_add(1, Ordering::Relaxed);
            trial_npv(&scratch, self.constants)
        };

        let values: Vec<f64> = if self.parallel {
            (0..n_trials)
                .into_par_iter()
                .map(|index| {
                    if cancel.load(Ordering::Relaxed) {
                        f64::NAN
                    } else {
                        trial(index)
                    }
                })
                .collect()
        } else {
            let mut values = Vec::with_capacity(n_trials);
            for index in 0..n_trials {
                if index % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
                    break;
                }
                values.push(trial(index));
            }
            values
        };

        if cancel.load(Ordering::Relaxed) {
            bail!(
                "Monte Carlo run for '{}' cancelled after {} of {n_trials} trials",
                self.scenario.name,
                completed.load(Ordering::Relaxed)
            );
        }
        Ok(SimulationResult::from_values(
            self.scenario.name.clone(),
            values,
        ))
    }
}

/// NPV of one sampled scenario; NaN marks an excluded trial.
fn trial_npv(scenario: &Scenario, constants: &Constants) -> f64 {
    if !validate_scenario(scenario).is_valid {
        return f64::NAN;
    }
    let investment = scenario.vehicle.capital_cost - scenario.financial.capital_grant;
    if investment <= 0.0 {
        return f64::NAN;
    }
    let cashflows = derive_cashflows(scenario, constants);
    let value = npv(investment, &cashflows, scenario.financial.discount_rate);
    if value.is_finite() { value } else { f64::NAN }
}

fn parameter_value(scenario: &Scenario, parameter: &str) -> Option<f64> {
    match parameter {
        "diesel_price_per_liter" => Some(scenario.financial.diesel_price_per_liter),
        "electricity_price_per_kwh" => Some(scenario.financial.electricity_price_per_kwh),
        "h2_price_per_kg" => Some(scenario.financial.h2_price_per_kg),
        "annual_km" => Some(scenario.profile.annual_km),
        "utilization" => Some(scenario.profile.utilization),
        "annual_operating_cost" => Some(scenario.vehicle.annual_operating_cost),
        "capital_cost" => Some(scenario.vehicle.capital_cost),
        "discount_rate" => Some(scenario.financial.discount_rate),
        // None for vehicles that declare no fade rate; those skip sampling
        "battery_degradation_rate" => scenario.vehicle.battery_degradation_rate,
        _ => None,
    }
}

fn set_parameter(scenario: &mut Scenario, parameter: &str, value: f64) {
    match parameter {
        "diesel_price_per_liter" => scenario.financial.diesel_price_per_liter = value,
        "electricity_price_per_kwh" => scenario.financial.electricity_price_per_kwh = value,
        "h2_price_per_kg" => scenario.financial.h2_price_per_kg = value,
        "annual_km" => {
            // Rescale the daily schedule so the profile stays consistent
            let ratio = value / scenario.profile.annual_km;
            scenario.profile.annual_km = value;
            scenario.profile.daily_km *= ratio;
        }
        "utilization" => scenario.profile.utilization = value,
        "annual_operating_cost" => scenario.vehicle.annual_operating_cost = value,
        "capital_cost" => scenario.vehicle.capital_cost = value,
        "discount_rate" => scenario.financial.discount_rate = value,
        "battery_degradation_rate" => scenario.vehicle.battery_degradation_rate = Some(value),
        _ => (),
    };
}
