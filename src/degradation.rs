//! Battery capacity fade and its effect on operational range.
//!
//! Calendar aging follows an exponential decay `P(t) = P₀·e^(−λt)`; cycle
//! aging compounds a small per-cycle loss. The default decay constant is
//! calibrated against trial data showing 15% fade over 1.5 years.
use crate::scenario::OperationalProfile;

/// Optimal battery operating temperature (°C).
const OPTIMAL_TEMP_C: f64 = 25.0;
/// Performance loss per degree away from the optimal temperature.
const TEMP_SENSITIVITY: f64 = 0.01;

/// Remaining usable life of a battery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemainingLife {
    /// Years until the end-of-life threshold is crossed
    Years(f64),
    /// The capacity never crosses the threshold at the given decay rate
    Indefinite,
}

/// Battery capacity after calendar aging.
///
/// Clamped to `[0, initial_capacity]` so that pathological inputs (negative
/// years or rates) cannot produce a capacity gain.
pub fn battery_degradation(initial_capacity: f64, years: f64, degradation_rate: f64) -> f64 {
    let degraded = initial_capacity * (-degradation_rate * years).exp();
    degraded.clamp(0.0, initial_capacity)
}

/// Battery capacity after a number of full charge cycles.
///
/// Cycles are fractional: partial discharges accumulate as equivalent full
/// cycles.
pub fn cycle_degradation(initial_capacity: f64, cycles: f64, degradation_per_cycle: f64) -> f64 {
    let degraded = initial_capacity * (1.0 - degradation_per_cycle).powf(cycles);
    degraded.clamp(0.0, initial_capacity)
}

/// Combined calendar and cycle aging.
///
/// `P(t) = P₀·e^(−λt)·(1−r)^cycles`
pub fn combined_degradation(
    initial_capacity: f64,
    years: f64,
    cycles: f64,
    degradation_rate: f64,
    degradation_per_cycle: f64,
) -> f64 {
    let calendar_factor = (-degradation_rate * years).exp();
    let cycle_factor = (1.0 - degradation_per_cycle).powf(cycles);
    (initial_capacity * calendar_factor * cycle_factor).clamp(0.0, initial_capacity)
}

/// Equivalent full charge cycles implied by a year of driving.
///
/// A truck that drives its rated range empties one full charge, so annual
/// cycles are annual distance over rated range. A non-positive range yields
/// zero cycles.
pub fn annual_full_cycles(annual_km: f64, rated_range_km: f64) -> f64 {
    if rated_range_km <= 0.0 {
        return 0.0;
    }
    annual_km / rated_range_km
}

/// Fraction of battery capacity retained after one year of service.
///
/// Combines the calendar decay with the cycling implied by the duty cycle;
/// this is the per-year attenuation that battery fade imposes on whatever the
/// battery earns.
pub fn annual_capacity_retention(
    degradation_rate: f64,
    annual_cycles: f64,
    degradation_per_cycle: f64,
) -> f64 {
    combined_degradation(1.0, 1.0, annual_cycles, degradation_rate, degradation_per_cycle)
}

/// Environmental corrections applied on top of battery state of health.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentalFactors {
    /// Temperature correction, 1.0 at the optimum
    pub temperature: f64,
    /// Payload correction, 1.0 when empty
    pub load: f64,
    /// Route gradient correction, 1.0 on flat terrain
    pub gradient: f64,
}

impl EnvironmentalFactors {
    /// No environmental penalty.
    pub fn ideal() -> EnvironmentalFactors {
        EnvironmentalFactors {
            temperature: 1.0,
            load: 1.0,
            gradient: 1.0,
        }
    }

    /// Derive the corrections from a duty cycle.
    pub fn from_profile(profile: &OperationalProfile) -> EnvironmentalFactors {
        EnvironmentalFactors {
            temperature: temperature_factor(profile.ambient_temp_c),
            load: (1.0 - 0.3 * profile.load_factor).max(0.7),
            gradient: (1.0 - 10.0 * profile.average_grade_rad.abs()).max(0.7),
        }
    }
}

/// Battery performance factor at an ambient temperature.
///
/// Performance drops 1% per degree away from the optimum, floored at 0.5.
pub fn temperature_factor(ambient_temp_c: f64) -> f64 {
    let deviation = (ambient_temp_c - OPTIMAL_TEMP_C).abs();
    (1.0 - TEMP_SENSITIVITY * deviation).clamp(0.5, 1.0)
}

/// Effective operational range after degradation and environment.
///
/// `R_effective = R_rated · P_battery · f_temp · f_load · f_gradient`
pub fn operational_range(
    rated_range_km: f64,
    battery_performance_factor: f64,
    factors: &EnvironmentalFactors,
) -> f64 {
    let effective = rated_range_km
        * battery_performance_factor
        * factors.temperature
        * factors.load
        * factors.gradient;
    effective.max(0.0)
}

/// Years until the state of health crosses the end-of-life threshold.
///
/// Inverts the exponential decay: `t = −ln(threshold / SoH) / λ`. A battery
/// already at or below the threshold has zero life left. A non-positive decay
/// rate means the threshold is never reached, which is a legitimate modelling
/// outcome rather than an error.
pub fn estimate_end_of_life(
    current_capacity: f64,
    initial_capacity: f64,
    degradation_rate: f64,
    eol_threshold: f64,
) -> RemainingLife {
    let state_of_health = current_capacity / initial_capacity;
    if state_of_health <= eol_threshold {
        return RemainingLife::Years(0.0);
    }
    if degradation_rate <= 0.0 {
        return RemainingLife::Indefinite;
    }
    let years = -(eol_threshold / state_of_health).ln() / degradation_rate;
    RemainingLife::Years(years.max(0.0))
}

/// Calibrate the decay constant from observed fade.
///
/// `λ = −ln(C_final / C_initial) / years`; degenerate observations yield 0.
pub fn degradation_rate_from_trials(
    initial_capacity: f64,
    final_capacity: f64,
    years: f64,
) -> f64 {
    if years <= 0.0 || initial_capacity <= 0.0 {
        return 0.0;
    }
    -(final_capacity / initial_capacity).ln() / years
}
