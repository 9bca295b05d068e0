//! Scenario appraisal: cashflow derivation and headline metrics.
//!
//! Yearly savings are the cost gap between running the duty cycle on the
//! baseline technology and on the candidate, with per-carrier price
//! escalation and an attenuation for battery-equipped candidates whose
//! performance fades with age.
use crate::constants::Constants;
use crate::degradation::{
    RemainingLife, annual_capacity_retention, annual_full_cycles, estimate_end_of_life,
    temperature_factor,
};
use crate::economics::{
    self, IrrOutcome, PaybackPeriod, irr, levelized_cost_per_km, payback_period,
    total_cost_of_ownership,
};
use crate::emissions::{emission_reduction, trip_emissions};
use crate::physics::{annual_energy, energy_cost};
use crate::scenario::{Scenario, VehicleSpecs};
use crate::validation::validate_scenario;
use anyhow::{Result, ensure};
use log::debug;

/// Iteration budget for the IRR search.
const IRR_MAX_ITERATIONS: u32 = 1000;

/// Headline appraisal metrics for one scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiAnalysis {
    /// Scenario label
    pub scenario_name: String,
    /// Capital cost net of the purchase grant
    pub initial_investment: f64,
    /// Year-ordered net savings relative to the baseline
    pub cashflows: Vec<f64>,
    /// Net present value of the switch
    pub npv: f64,
    /// Internal rate of return of the switch
    pub irr: IrrOutcome,
    /// Undiscounted payback period
    pub payback: PaybackPeriod,
    /// Present value of owning and running the candidate
    pub total_cost_of_ownership: f64,
    /// Levelized cost per kilometre for the candidate
    pub levelized_cost_per_km: f64,
    /// CO₂ avoided per year at year-0 performance (kg)
    pub annual_co2_reduction_kg: f64,
    /// CO₂ avoided relative to the baseline (%)
    pub co2_reduction_percent: f64,
    /// Years until the traction battery reaches end of life, for
    /// battery-equipped candidates
    pub battery_end_of_life: Option<RemainingLife>,
}

/// Yearly net savings of running the candidate instead of the baseline.
///
/// Both technologies are costed on the same chassis and duty cycle so the
/// comparison isolates the powertrain. Year `t` escalates each carrier's
/// energy cost at its own rate and the maintenance delta at the maintenance
/// rate; battery-equipped candidates see the whole flow attenuated,
/// compounded over age, by the capacity retained after one year of calendar
/// fade and duty-cycle cycling. A candidate that declares no fade rate falls
/// back to the flat attenuation factor from [`Constants`].
pub fn derive_cashflows(scenario: &Scenario, constants: &Constants) -> Vec<f64> {
    let vehicle = &scenario.vehicle;
    let profile = &scenario.profile;
    let financial = &scenario.financial;

    let temp_factor = temperature_factor(profile.ambient_temp_c);
    let candidate_draw =
        annual_energy(vehicle, profile, vehicle.technology, temp_factor, constants);
    let baseline_draw = annual_energy(
        vehicle,
        profile,
        scenario.baseline_technology,
        temp_factor,
        constants,
    );

    let candidate_energy_cost = energy_cost(&candidate_draw, financial).value();
    let baseline_energy_cost = energy_cost(&baseline_draw, financial).value();
    let operating_saving = scenario
        .baseline_operating_cost
        .unwrap_or(vehicle.annual_operating_cost)
        - vehicle.annual_operating_cost;

    let candidate_escalation = financial.escalation_for(vehicle.technology);
    let baseline_escalation = financial.escalation_for(scenario.baseline_technology);
    let attenuation = if vehicle.technology.has_battery() {
        match vehicle.battery_degradation_rate {
            Some(rate) => {
                let cycles =
                    annual_full_cycles(profile.effective_annual_km(), vehicle.rated_range_km);
                annual_capacity_retention(rate, cycles, constants.degradation_per_cycle)
            }
            None => constants.cashflow_degradation_factor,
        }
    } else {
        1.0
    };

    (1..=financial.analysis_period_years)
        .map(|year| {
            let t = year as i32;
            let fuel_saving = baseline_energy_cost * (1.0 + baseline_escalation).powi(t)
                - candidate_energy_cost * (1.0 + candidate_escalation).powi(t);
            let operating = operating_saving * (1.0 + financial.maintenance_escalation).powi(t);
            (fuel_saving + operating + financial.annual_subsidy) * attenuation.powi(t)
        })
        .collect()
}

/// Full financial and environmental appraisal of a scenario.
pub fn appraise(scenario: &Scenario, constants: &Constants) -> Result<RoiAnalysis> {
    let report = validate_scenario(scenario);
    ensure!(
        report.is_valid,
        "Scenario '{}' failed validation: {}",
        scenario.name,
        report.summary()
    );

    let financial = &scenario.financial;
    let initial_investment = scenario.vehicle.capital_cost - financial.capital_grant;
    ensure!(
        initial_investment > 0.0,
        "Capital grant covers the whole purchase price of '{}'",
        scenario.vehicle.name
    );

    let cashflows = derive_cashflows(scenario, constants);
    let npv = economics::npv(initial_investment, &cashflows, financial.discount_rate);
    debug!(
        "Scenario '{}': investment {initial_investment:.0}, NPV {npv:.0}",
        scenario.name
    );

    let temp_factor = temperature_factor(scenario.profile.ambient_temp_c);
    let distance_km = scenario.profile.effective_annual_km();
    let candidate_draw = annual_energy(
        &scenario.vehicle,
        &scenario.profile,
        scenario.vehicle.technology,
        temp_factor,
        constants,
    );
    let baseline_draw = annual_energy(
        &scenario.vehicle,
        &scenario.profile,
        scenario.baseline_technology,
        temp_factor,
        constants,
    );
    let candidate_co2 = trip_emissions(
        &candidate_draw,
        distance_km,
        scenario.vehicle.technology,
        constants,
    )
    .co2_kg;
    let baseline_co2 = trip_emissions(
        &baseline_draw,
        distance_km,
        scenario.baseline_technology,
        constants,
    )
    .co2_kg;

    let annual_outgoings =
        scenario.vehicle.annual_operating_cost + energy_cost(&candidate_draw, financial).value();

    let battery_end_of_life = scenario
        .vehicle
        .technology
        .has_battery()
        .then(|| battery_outlook(&scenario.vehicle, distance_km, constants));

    Ok(RoiAnalysis {
        scenario_name: scenario.name.clone(),
        initial_investment,
        npv,
        irr: irr(initial_investment, &cashflows, IRR_MAX_ITERATIONS),
        payback: payback_period(initial_investment, &cashflows),
        total_cost_of_ownership: total_cost_of_ownership(
            initial_investment,
            annual_outgoings,
            financial.analysis_period_years,
            financial.discount_rate,
        ),
        levelized_cost_per_km: levelized_cost_per_km(
            initial_investment,
            annual_outgoings,
            distance_km,
            financial.analysis_period_years,
            financial.discount_rate,
            constants.residual_value_factor,
        ),
        annual_co2_reduction_kg: baseline_co2 - candidate_co2,
        co2_reduction_percent: emission_reduction(baseline_co2, candidate_co2),
        battery_end_of_life,
        cashflows,
    })
}

/// Years until a new battery reaches end of life, whichever of calendar fade
/// or the rated cycle budget runs out first.
fn battery_outlook(
    vehicle: &VehicleSpecs,
    annual_km: f64,
    constants: &Constants,
) -> RemainingLife {
    let rate = vehicle
        .battery_degradation_rate
        .unwrap_or(constants.battery_degradation_rate);
    let calendar = estimate_end_of_life(1.0, 1.0, rate, constants.end_of_life_threshold);

    let cycles_per_year = annual_full_cycles(annual_km, vehicle.rated_range_km);
    let cycle_limited = vehicle
        .battery_cycle_life
        .filter(|_| cycles_per_year > 0.0)
        .map(|life| f64::from(life) / cycles_per_year);

    match (calendar, cycle_limited) {
        (RemainingLife::Years(calendar_years), Some(cycle_years)) => {
            RemainingLife::Years(calendar_years.min(cycle_years))
        }
        (RemainingLife::Indefinite, Some(cycle_years)) => RemainingLife::Years(cycle_years),
        (outcome, None) => outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{constants, scenario};
    use crate::scenario::Technology;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_cashflows_cover_the_horizon(scenario: Scenario, constants: Constants) {
        let cashflows = derive_cashflows(&scenario, &constants);
        assert_eq!(
            cashflows.len(),
            scenario.financial.analysis_period_years as usize
        );
        // Diesel energy for this duty cycle costs more than electricity, so
        // every year's flow is a genuine saving
        assert!(cashflows.iter().all(|cf| *cf > 0.0));
    }

    #[rstest]
    fn test_declared_fade_attenuates_savings(mut scenario: Scenario, constants: Constants) {
        let attenuated = derive_cashflows(&scenario, &constants);
        // Strip the fade declaration and the flat fallback: no attenuation
        scenario.vehicle.battery_degradation_rate = None;
        let mut flat = constants.clone();
        flat.cashflow_degradation_factor = 1.0;
        let full = derive_cashflows(&scenario, &flat);
        for (a, f) in attenuated.iter().zip(&full) {
            assert!(a < f);
        }
    }

    #[rstest]
    fn test_faster_fade_attenuates_more(mut scenario: Scenario, constants: Constants) {
        scenario.vehicle.battery_degradation_rate = Some(0.05);
        let slow = derive_cashflows(&scenario, &constants);
        scenario.vehicle.battery_degradation_rate = Some(0.20);
        let fast = derive_cashflows(&scenario, &constants);
        for (f, s) in fast.iter().zip(&slow) {
            assert!(f < s);
        }
    }

    #[rstest]
    fn test_undeclared_fade_falls_back_to_flat_factor(
        mut scenario: Scenario,
        constants: Constants,
    ) {
        scenario.vehicle.battery_degradation_rate = None;
        let attenuated = derive_cashflows(&scenario, &constants);
        let mut flat = constants.clone();
        flat.cashflow_degradation_factor = 1.0;
        let full = derive_cashflows(&scenario, &flat);
        for (year, (a, f)) in attenuated.iter().zip(&full).enumerate() {
            let expected = f * constants.cashflow_degradation_factor.powi(year as i32 + 1);
            assert_approx_eq!(f64, *a, expected, epsilon = 1e-6);
        }
    }

    #[rstest]
    fn test_subsidy_raises_cashflows(mut scenario: Scenario, constants: Constants) {
        let without = derive_cashflows(&scenario, &constants);
        let attenuation = annual_capacity_retention(
            scenario.vehicle.battery_degradation_rate.unwrap(),
            annual_full_cycles(
                scenario.profile.effective_annual_km(),
                scenario.vehicle.rated_range_km,
            ),
            constants.degradation_per_cycle,
        );
        scenario.financial.annual_subsidy = 10_000.0;
        let with = derive_cashflows(&scenario, &constants);
        for (year, (w, wo)) in with.iter().zip(&without).enumerate() {
            let expected = 10_000.0 * attenuation.powi(year as i32 + 1);
            assert_approx_eq!(f64, w - wo, expected, epsilon = 1e-6);
        }
    }

    #[rstest]
    fn test_appraise_is_internally_consistent(scenario: Scenario, constants: Constants) {
        let analysis = appraise(&scenario, &constants).unwrap();
        assert_approx_eq!(
            f64,
            analysis.npv,
            economics::npv(
                analysis.initial_investment,
                &analysis.cashflows,
                scenario.financial.discount_rate
            ),
            epsilon = 1e-6
        );
        assert_approx_eq!(
            f64,
            analysis.initial_investment,
            scenario.vehicle.capital_cost - scenario.financial.capital_grant
        );
        // The kg and percent views of the CO2 change must agree in sign
        assert_eq!(
            analysis.annual_co2_reduction_kg > 0.0,
            analysis.co2_reduction_percent > 0.0
        );
        assert!(analysis.levelized_cost_per_km > 0.0);
    }

    #[rstest]
    fn test_co2_reduction_follows_grid_intensity(scenario: Scenario, constants: Constants) {
        // On the default 0.75 kg/kWh grid this duty cycle emits more CO2 on
        // electricity than on diesel, so the switch is not a reduction
        let dirty_grid = appraise(&scenario, &constants).unwrap();
        assert!(dirty_grid.annual_co2_reduction_kg < 0.0);
        assert!(dirty_grid.co2_reduction_percent < 0.0);

        let mut clean = constants.clone();
        clean.grid_co2_per_kwh = 0.2;
        let clean_grid = appraise(&scenario, &clean).unwrap();
        assert!(clean_grid.annual_co2_reduction_kg > 0.0);
        assert!(clean_grid.co2_reduction_percent > 0.0);
    }

    #[rstest]
    fn test_battery_end_of_life_for_battery_candidates(scenario: Scenario, constants: Constants) {
        let analysis = appraise(&scenario, &constants).unwrap();
        let Some(RemainingLife::Years(years)) = analysis.battery_end_of_life else {
            panic!("expected a battery outlook");
        };
        // Calendar fade at 0.106/yr crosses the 80% threshold well before the
        // 3000-cycle budget runs out at ~257 cycles/yr
        assert_approx_eq!(f64, years, (1.0_f64 / 0.8).ln() / 0.106, epsilon = 1e-9);
    }

    #[rstest]
    fn test_cycle_budget_caps_battery_life(mut scenario: Scenario, constants: Constants) {
        // A nearly fade-free battery is limited by its cycle budget instead
        scenario.vehicle.battery_degradation_rate = Some(1e-6);
        let analysis = appraise(&scenario, &constants).unwrap();
        let Some(RemainingLife::Years(years)) = analysis.battery_end_of_life else {
            panic!("expected a battery outlook");
        };
        let cycles_per_year = scenario.profile.effective_annual_km() / 350.0;
        assert_approx_eq!(f64, years, 3000.0 / cycles_per_year, epsilon = 1e-9);
    }

    #[rstest]
    fn test_no_battery_outlook_for_combustion_candidates(
        mut scenario: Scenario,
        constants: Constants,
    ) {
        scenario.vehicle.technology = Technology::Diesel;
        let analysis = appraise(&scenario, &constants).unwrap();
        assert_eq!(analysis.battery_end_of_life, None);
    }

    #[rstest]
    fn test_appraise_rejects_invalid_scenario(mut scenario: Scenario, constants: Constants) {
        scenario.vehicle.mass_kg = -1.0;
        assert!(appraise(&scenario, &constants).is_err());
    }

    #[rstest]
    fn test_appraise_rejects_total_grant(mut scenario: Scenario, constants: Constants) {
        scenario.financial.capital_grant = scenario.vehicle.capital_cost;
        assert!(appraise(&scenario, &constants).is_err());
    }
}
