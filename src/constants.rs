//! Physical and economic constants shared across the modelling components.
//!
//! A [`Constants`] value is built once at startup, optionally overridden from a
//! TOML file, and passed by reference into every component. Nothing in the
//! crate reads these values from global state.
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Immutable model configuration.
///
/// Every field has a reference default, so a settings file only needs to name
/// the values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Constants {
    /// Gravitational acceleration (m/s²)
    pub gravity_ms2: f64,
    /// Air density at sea level, 15 °C (kg/m³)
    pub air_density_kgm3: f64,
    /// Default rolling resistance coefficient for heavy trucks on asphalt
    pub rolling_resistance: f64,
    /// Default aerodynamic drag coefficient for a boxy truck profile
    pub drag_coefficient: f64,
    /// Default frontal area (m²)
    pub frontal_area_m2: f64,
    /// Cab auxiliary load while the vehicle is operating (kW)
    pub auxiliary_power_kw: f64,

    /// Usable energy content of hydrogen (kWh/kg)
    pub kwh_per_kg_h2: f64,
    /// Usable energy content of diesel (kWh/L)
    pub kwh_per_liter_diesel: f64,

    /// Diesel engine tank-to-wheel efficiency
    pub diesel_efficiency: f64,
    /// Fuel-cell powertrain efficiency (tank to wheel)
    pub fuelcell_efficiency: f64,
    /// Combined efficiency of a diesel-electric hybrid powertrain
    pub hybrid_efficiency: f64,
    /// Electric drivetrain efficiency applied downstream of the energy store
    pub drivetrain_efficiency: f64,
    /// Battery round-trip charging efficiency
    pub battery_charging_efficiency: f64,
    /// Fraction of a hybrid's wheel energy supplied by the diesel path
    pub hybrid_fuel_split: f64,

    /// Tailpipe CO₂ from burning one litre of diesel (kg/L)
    pub diesel_co2_per_liter: f64,
    /// Grid electricity carbon intensity (kg CO₂/kWh)
    pub grid_co2_per_kwh: f64,
    /// Well-to-tank CO₂ for electrolytic hydrogen (kg/kg)
    pub green_h2_co2_per_kg: f64,
    /// Well-to-tank CO₂ for steam-reformed hydrogen (kg/kg)
    pub grey_h2_co2_per_kg: f64,
    /// Diesel NOₓ emission factor (g/km)
    pub diesel_nox_per_km: f64,
    /// Diesel particulate matter emission factor (g/km)
    pub diesel_pm_per_km: f64,

    /// Calendar decay constant for battery capacity (per year)
    pub battery_degradation_rate: f64,
    /// Capacity fade per full charge cycle
    pub degradation_per_cycle: f64,
    /// Capacity fraction at which a battery reaches end of life
    pub end_of_life_threshold: f64,
    /// Annual attenuation applied to savings of battery-equipped vehicles
    pub cashflow_degradation_factor: f64,

    /// Real discount rate used when a scenario does not supply one
    pub discount_rate: f64,
    /// Appraisal horizon (years)
    pub analysis_period_years: u32,
    /// Residual value at end of horizon as a fraction of capital cost
    pub residual_value_factor: f64,
    /// Annual escalation of diesel prices
    pub diesel_price_escalation: f64,
    /// Annual escalation of electricity prices
    pub electricity_price_escalation: f64,
    /// Annual escalation of hydrogen prices
    pub h2_price_escalation: f64,
    /// Annual escalation of maintenance costs
    pub maintenance_escalation: f64,
}

impl Default for Constants {
    fn default() -> Self {
        Constants {
            gravity_ms2: 9.81,
            air_density_kgm3: 1.225,
            rolling_resistance: 0.006,
            drag_coefficient: 1.0,
            frontal_area_m2: 8.0,
            auxiliary_power_kw: 5.0,
            kwh_per_kg_h2: 33.3,
            kwh_per_liter_diesel: 10.0,
            diesel_efficiency: 0.35,
            fuelcell_efficiency: 0.50,
            hybrid_efficiency: 0.60,
            drivetrain_efficiency: 0.90,
            battery_charging_efficiency: 0.94,
            hybrid_fuel_split: 0.5,
            diesel_co2_per_liter: 2.68,
            grid_co2_per_kwh: 0.75,
            green_h2_co2_per_kg: 0.48,
            grey_h2_co2_per_kg: 10.0,
            diesel_nox_per_km: 5.0,
            diesel_pm_per_km: 0.01,
            battery_degradation_rate: 0.106,
            degradation_per_cycle: 1e-4,
            end_of_life_threshold: 0.80,
            cashflow_degradation_factor: 0.98,
            discount_rate: 0.08,
            analysis_period_years: 5,
            residual_value_factor: 0.20,
            diesel_price_escalation: 0.03,
            electricity_price_escalation: 0.02,
            h2_price_escalation: 0.01,
            maintenance_escalation: 0.025,
        }
    }
}

impl Constants {
    /// Read constants from a TOML file, applying defaults for absent fields.
    pub fn from_path<P: AsRef<Path>>(file_path: P) -> Result<Constants> {
        let file_path = file_path.as_ref();
        let contents = fs::read_to_string(file_path)
            .with_context(|| format!("Could not read {}", file_path.display()))?;
        let constants: Constants = toml::from_str(&contents)
            .with_context(|| format!("Could not parse {}", file_path.display()))?;
        constants.validate()?;
        Ok(constants)
    }

    /// Check that overridden values are physically and economically sensible.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("gravity_ms2", self.gravity_ms2),
            ("air_density_kgm3", self.air_density_kgm3),
            ("rolling_resistance", self.rolling_resistance),
            ("drag_coefficient", self.drag_coefficient),
            ("frontal_area_m2", self.frontal_area_m2),
            ("kwh_per_kg_h2", self.kwh_per_kg_h2),
            ("kwh_per_liter_diesel", self.kwh_per_liter_diesel),
        ] {
            ensure!(value > 0.0, "{name} must be positive (got {value})");
        }
        for (name, value) in [
            ("diesel_efficiency", self.diesel_efficiency),
            ("fuelcell_efficiency", self.fuelcell_efficiency),
            ("hybrid_efficiency", self.hybrid_efficiency),
            ("drivetrain_efficiency", self.drivetrain_efficiency),
            (
                "battery_charging_efficiency",
                self.battery_charging_efficiency,
            ),
        ] {
            ensure!(
                value > 0.0 && value <= 1.0,
                "{name} must be in (0, 1] (got {value})"
            );
        }
        ensure!(
            (0.0..=1.0).contains(&self.hybrid_fuel_split),
            "hybrid_fuel_split must be in [0, 1] (got {})",
            self.hybrid_fuel_split
        );
        ensure!(
            (0.0..1.0).contains(&self.end_of_life_threshold),
            "end_of_life_threshold must be in [0, 1) (got {})",
            self.end_of_life_threshold
        );
        ensure!(
            (0.0..=0.5).contains(&self.discount_rate),
            "discount_rate must be in [0, 0.5] (got {})",
            self.discount_rate
        );
        ensure!(
            (1..=30).contains(&self.analysis_period_years),
            "analysis_period_years must be in [1, 30] (got {})",
            self.analysis_period_years
        );
        Ok(())
    }
}
