//! Field-level checks for scenario records.
//!
//! Constructors reject the first violation; the batch entry point
//! [`validate_scenario`] collects every violation so that a data file with
//! several mistakes can be fixed in one pass.
use crate::error::ModelError;
use crate::scenario::{FinancialParams, OperationalProfile, Scenario, VehicleSpecs};
use itertools::Itertools;

/// Maximum relative disagreement tolerated between the stated annual distance
/// and the distance implied by the daily schedule.
pub const DISTANCE_CONSISTENCY_TOLERANCE: f64 = 0.2;

fn check_positive(field: &'static str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ModelError::Validation {
            field,
            value,
            reason: "must be positive".into(),
        })
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ModelError::Validation {
            field,
            value,
            reason: "must be non-negative".into(),
        })
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ModelError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ModelError::Validation {
            field,
            value,
            reason: format!("must be in [{min}, {max}]"),
        })
    }
}

/// All constraint violations in a vehicle record.
pub fn vehicle_spec_errors(specs: &VehicleSpecs) -> Vec<ModelError> {
    let mut checks = vec![
        check_positive("mass_kg", specs.mass_kg),
        check_positive("frontal_area_m2", specs.frontal_area_m2),
        check_range("drag_coefficient", specs.drag_coefficient, 0.1, 2.0),
        check_range("rolling_resistance", specs.rolling_resistance, 0.001, 0.05),
        check_positive("rated_range_km", specs.rated_range_km),
        check_positive("capital_cost", specs.capital_cost),
        check_non_negative("annual_operating_cost", specs.annual_operating_cost),
    ];
    if let Some(rate) = specs.battery_degradation_rate {
        checks.push(check_range("battery_degradation_rate", rate, 0.0, 1.0));
    }
    checks.into_iter().filter_map(Result::err).collect()
}

/// All constraint violations in an operational profile.
///
/// Besides per-field bounds this checks internal consistency: the stated
/// annual distance must agree with `daily_km * operating_days` to within
/// [`DISTANCE_CONSISTENCY_TOLERANCE`], which absorbs seasonal variation
/// without letting plainly contradictory schedules through.
pub fn profile_errors(profile: &OperationalProfile) -> Vec<ModelError> {
    let mut errors: Vec<ModelError> = [
        check_positive("daily_km", profile.daily_km),
        check_positive("annual_km", profile.annual_km),
        check_range(
            "operating_days",
            f64::from(profile.operating_days),
            1.0,
            365.0,
        ),
        check_positive("average_speed_kmh", profile.average_speed_kmh),
        check_range("average_grade_rad", profile.average_grade_rad, -0.2, 0.2),
        check_range("utilization", profile.utilization, 0.0, 1.0),
        check_range("load_factor", profile.load_factor, 0.0, 1.0),
    ]
    .into_iter()
    .filter_map(Result::err)
    .collect();

    let implied_annual_km = profile.daily_km * f64::from(profile.operating_days);
    if implied_annual_km > 0.0 && profile.annual_km > 0.0 {
        let relative_gap = (profile.annual_km - implied_annual_km).abs() / implied_annual_km;
        if relative_gap > DISTANCE_CONSISTENCY_TOLERANCE {
            errors.push(ModelError::Validation {
                field: "annual_km",
                value: profile.annual_km,
                reason: format!(
                    "disagrees with daily_km * operating_days = {implied_annual_km} by more \
                     than {:.0}%",
                    DISTANCE_CONSISTENCY_TOLERANCE * 100.0
                ),
            });
        }
    }
    errors
}

/// All constraint violations in the financial assumptions.
pub fn financial_errors(financial: &FinancialParams) -> Vec<ModelError> {
    let escalation_checks = [
        (
            "diesel_price_escalation",
            financial.diesel_price_escalation,
        ),
        (
            "electricity_price_escalation",
            financial.electricity_price_escalation,
        ),
        ("h2_price_escalation", financial.h2_price_escalation),
        ("maintenance_escalation", financial.maintenance_escalation),
    ]
    .into_iter()
    .map(|(field, value)| check_range(field, value, -0.1, 0.3));

    [
        check_range("discount_rate", financial.discount_rate, 0.0, 0.5),
        check_range(
            "analysis_period_years",
            f64::from(financial.analysis_period_years),
            1.0,
            30.0,
        ),
        check_positive("diesel_price_per_liter", financial.diesel_price_per_liter),
        check_positive(
            "electricity_price_per_kwh",
            financial.electricity_price_per_kwh,
        ),
        check_positive("h2_price_per_kg", financial.h2_price_per_kg),
        check_non_negative("capital_grant", financial.capital_grant),
        check_non_negative("annual_subsidy", financial.annual_subsidy),
    ]
    .into_iter()
    .chain(escalation_checks)
    .filter_map(Result::err)
    .collect()
}

/// Outcome of a batch validation pass over a whole scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    /// Whether the scenario passed every check
    pub is_valid: bool,
    /// Messages for each violation, in record order
    pub violations: Vec<String>,
}

impl ValidationReport {
    /// All violations joined into a single line, for log output.
    pub fn summary(&self) -> String {
        if self.is_valid {
            "scenario is valid".into()
        } else {
            self.violations.iter().join("; ")
        }
    }
}

/// Run every record check over a scenario and collect the violations.
pub fn validate_scenario(scenario: &Scenario) -> ValidationReport {
    let violations: Vec<String> = vehicle_spec_errors(&scenario.vehicle)
        .into_iter()
        .map(|e| format!("vehicle: {e}"))
        .chain(
            profile_errors(&scenario.profile)
                .into_iter()
                .map(|e| format!("profile: {e}")),
        )
        .chain(
            financial_errors(&scenario.financial)
                .into_iter()
                .map(|e| format!("financial: {e}")),
        )
        .collect();
    ValidationReport {
        is_valid: violations.is_empty(),
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::scenario;
    use rstest::rstest;

    #[rstest]
    fn test_valid_scenario_passes(scenario: Scenario) {
        let report = validate_scenario(&scenario);
        assert!(report.is_valid);
        assert!(report.violations.is_empty());
        assert_eq!(report.summary(), "scenario is valid");
    }

    #[rstest]
    fn test_batch_validation_collects_all_violations(mut scenario: Scenario) {
        scenario.vehicle.mass_kg = 0.0;
        scenario.vehicle.drag_coefficient = 5.0;
        scenario.financial.discount_rate = 0.9;
        let report = validate_scenario(&scenario);
        assert!(!report.is_valid);
        assert_eq!(report.violations.len(), 3);
        assert!(report.violations[0].contains("mass_kg"));
        assert!(report.violations[1].contains("drag_coefficient"));
        assert!(report.violations[2].contains("discount_rate"));
    }

    #[rstest]
    fn test_distance_consistency_tolerance(mut scenario: Scenario) {
        // 400 km/day * 250 days = 100,000 km: within 20% either way is fine
        scenario.profile.annual_km = 115_000.0;
        assert!(validate_scenario(&scenario).is_valid);

        scenario.profile.annual_km = 150_000.0;
        let report = validate_scenario(&scenario);
        assert!(!report.is_valid);
        assert!(report.violations[0].contains("annual_km"));
    }

    #[rstest]
    fn test_nan_is_rejected(mut scenario: Scenario) {
        scenario.profile.utilization = f64::NAN;
        assert!(!validate_scenario(&scenario).is_valid);
    }
}
