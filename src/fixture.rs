//! Shared test fixtures.
use crate::constants::Constants;
use crate::scenario::{
    FinancialParams, OperationalProfile, Scenario, Technology, VehicleSpecs,
};
use rstest::fixture;

/// Reference constants.
#[fixture]
pub fn constants() -> Constants {
    Constants::default()
}

/// A battery-electric 18 t truck.
#[fixture]
pub fn vehicle() -> VehicleSpecs {
    VehicleSpecs {
        name: "eTruck 40t".into(),
        technology: Technology::Bev,
        mass_kg: 18_000.0,
        frontal_area_m2: 8.0,
        drag_coefficient: 1.0,
        rolling_resistance: 0.006,
        rated_range_km: 350.0,
        capital_cost: 450_000.0,
        annual_operating_cost: 12_000.0,
        battery_degradation_rate: Some(0.106),
        battery_cycle_life: Some(3000),
    }
}

/// A regional haulage duty cycle.
#[fixture]
pub fn profile() -> OperationalProfile {
    OperationalProfile {
        daily_km: 400.0,
        annual_km: 100_000.0,
        operating_days: 250,
        average_speed_kmh: 60.0,
        average_grade_rad: 0.0,
        utilization: 0.9,
        load_factor: 0.8,
        ambient_temp_c: 20.0,
    }
}

/// Reference prices and rates.
#[fixture]
pub fn financial() -> FinancialParams {
    FinancialParams {
        discount_rate: 0.08,
        analysis_period_years: 5,
        diesel_price_per_liter: 1.50,
        electricity_price_per_kwh: 0.25,
        h2_price_per_kg: 8.0,
        diesel_price_escalation: 0.03,
        electricity_price_escalation: 0.02,
        h2_price_escalation: 0.01,
        maintenance_escalation: 0.025,
        capital_grant: 0.0,
        annual_subsidy: 0.0,
    }
}

/// A BEV candidate appraised against a diesel baseline.
#[fixture]
pub fn scenario(
    vehicle: VehicleSpecs,
    profile: OperationalProfile,
    financial: FinancialParams,
) -> Scenario {
    Scenario::new(
        "depot A".into(),
        vehicle,
        profile,
        financial,
        Technology::Diesel,
        None,
    )
    .unwrap()
}
