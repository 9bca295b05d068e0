//! Scenario records consumed by the modelling core.
//!
//! A [`Scenario`] bundles one candidate vehicle, its duty cycle and the
//! financial assumptions for appraising it against a baseline technology.
//! Records are validated on construction so that downstream maths never sees
//! physically impossible inputs.
use crate::constants::Constants;
use crate::error::ModelError;
use crate::validation::{financial_errors, profile_errors, vehicle_spec_errors};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Powertrain technology classes under analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Technology {
    /// Conventional diesel internal combustion
    Diesel,
    /// Battery-electric
    Bev,
    /// Hydrogen fuel-cell electric
    #[serde(alias = "hydrogen")]
    Fcet,
    /// Diesel-electric hybrid
    Hybrid,
}

impl Technology {
    /// The canonical lowercase tag for this technology.
    pub fn as_str(&self) -> &'static str {
        match self {
            Technology::Diesel => "diesel",
            Technology::Bev => "bev",
            Technology::Fcet => "fcet",
            Technology::Hybrid => "hybrid",
        }
    }

    /// Whether the powertrain carries a traction battery subject to fade.
    pub fn has_battery(&self) -> bool {
        matches!(self, Technology::Bev | Technology::Hybrid)
    }

    /// All technology classes, in display order.
    pub fn all() -> [Technology; 4] {
        [
            Technology::Diesel,
            Technology::Bev,
            Technology::Fcet,
            Technology::Hybrid,
        ]
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Technology {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "diesel" => Ok(Technology::Diesel),
            "bev" | "electric" => Ok(Technology::Bev),
            "fcet" | "hydrogen" => Ok(Technology::Fcet),
            "hybrid" => Ok(Technology::Hybrid),
            _ => Err(ModelError::UnknownTechnology(s.to_string())),
        }
    }
}

/// Physical and cost parameters of one truck model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSpecs {
    /// Model designation, for reporting only
    pub name: String,
    /// Powertrain class
    pub technology: Technology,
    /// Gross vehicle mass including payload (kg)
    pub mass_kg: f64,
    /// Frontal area (m²)
    pub frontal_area_m2: f64,
    /// Aerodynamic drag coefficient
    pub drag_coefficient: f64,
    /// Rolling resistance coefficient
    pub rolling_resistance: f64,
    /// Manufacturer-rated range on a full charge or tank (km)
    pub rated_range_km: f64,
    /// Purchase price before incentives
    pub capital_cost: f64,
    /// Annual maintenance and servicing cost
    pub annual_operating_cost: f64,
    /// Calendar decay constant of the traction battery, if one is fitted
    #[serde(default)]
    pub battery_degradation_rate: Option<f64>,
    /// Rated full charge cycles of the traction battery, if one is fitted
    #[serde(default)]
    pub battery_cycle_life: Option<u32>,
}

impl VehicleSpecs {
    /// Check all field constraints, returning the first violation.
    pub fn validate(&self) -> Result<(), ModelError> {
        vehicle_spec_errors(self).into_iter().next().map_or(Ok(()), Err)
    }
}

/// Duty cycle of the route the vehicle is appraised on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalProfile {
    /// Distance driven per operating day (km)
    pub daily_km: f64,
    /// Distance driven per year (km)
    pub annual_km: f64,
    /// Operating days per year
    pub operating_days: u32,
    /// Average speed over the duty cycle (km/h)
    pub average_speed_kmh: f64,
    /// Average road grade (radians, positive uphill)
    pub average_grade_rad: f64,
    /// Fraction of scheduled distance actually driven
    pub utilization: f64,
    /// Payload carried as a fraction of maximum
    pub load_factor: f64,
    /// Typical ambient temperature on the route (°C)
    #[serde(default = "default_ambient_temp")]
    pub ambient_temp_c: f64,
}

fn default_ambient_temp() -> f64 {
    20.0
}

impl OperationalProfile {
    /// Check all field constraints, returning the first violation.
    pub fn validate(&self) -> Result<(), ModelError> {
        profile_errors(self).into_iter().next().map_or(Ok(()), Err)
    }

    /// Distance actually driven per year after utilisation losses (km).
    pub fn effective_annual_km(&self) -> f64 {
        self.annual_km * self.utilization
    }
}

/// Financial assumptions for the appraisal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialParams {
    /// Real discount rate
    pub discount_rate: f64,
    /// Appraisal horizon (years)
    pub analysis_period_years: u32,
    /// Diesel price (per litre)
    pub diesel_price_per_liter: f64,
    /// Electricity price (per kWh)
    pub electricity_price_per_kwh: f64,
    /// Hydrogen price (per kg)
    pub h2_price_per_kg: f64,
    /// Annual escalation of diesel prices
    pub diesel_price_escalation: f64,
    /// Annual escalation of electricity prices
    pub electricity_price_escalation: f64,
    /// Annual escalation of hydrogen prices
    pub h2_price_escalation: f64,
    /// Annual escalation of maintenance costs
    pub maintenance_escalation: f64,
    /// One-off purchase incentive deducted from capital cost
    #[serde(default)]
    pub capital_grant: f64,
    /// Recurring annual operating incentive
    #[serde(default)]
    pub annual_subsidy: f64,
}

impl FinancialParams {
    /// Check all field constraints, returning the first violation.
    pub fn validate(&self) -> Result<(), ModelError> {
        financial_errors(self).into_iter().next().map_or(Ok(()), Err)
    }

    /// The fuel price escalation rate for the carrier a technology draws on.
    pub fn escalation_for(&self, technology: Technology) -> f64 {
        match technology {
            Technology::Diesel | Technology::Hybrid => self.diesel_price_escalation,
            Technology::Bev => self.electricity_price_escalation,
            Technology::Fcet => self.h2_price_escalation,
        }
    }
}

/// One fully-specified appraisal case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    /// Scenario label, for reporting only
    pub name: String,
    /// The candidate vehicle
    pub vehicle: VehicleSpecs,
    /// The duty cycle it is appraised on
    pub profile: OperationalProfile,
    /// Financial assumptions
    pub financial: FinancialParams,
    /// Technology the candidate is compared against
    pub baseline_technology: Technology,
    /// Annual maintenance cost of the baseline vehicle, if it differs from
    /// the candidate's
    pub baseline_operating_cost: Option<f64>,
}

impl Scenario {
    /// Assemble a scenario, rejecting any record that fails validation.
    pub fn new(
        name: String,
        vehicle: VehicleSpecs,
        profile: OperationalProfile,
        financial: FinancialParams,
        baseline_technology: Technology,
        baseline_operating_cost: Option<f64>,
    ) -> Result<Scenario, ModelError> {
        vehicle.validate()?;
        profile.validate()?;
        financial.validate()?;
        if let Some(cost) = baseline_operating_cost
            && (!cost.is_finite() || cost < 0.0)
        {
            return Err(ModelError::Validation {
                field: "baseline_operating_cost",
                value: cost,
                reason: "must be non-negative".into(),
            });
        }
        Ok(Scenario {
            name,
            vehicle,
            profile,
            financial,
            baseline_technology,
            baseline_operating_cost,
        })
    }

    /// Read a scenario from a TOML file, migrating older schema versions.
    pub fn from_path<P: AsRef<Path>>(file_path: P, constants: &Constants) -> Result<Scenario> {
        let file_path = file_path.as_ref();
        let contents = fs::read_to_string(file_path)
            .with_context(|| format!("Could not read {}", file_path.display()))?;
        let file: ScenarioFile = toml::from_str(&contents)
            .with_context(|| format!("Could not parse {}", file_path.display()))?;
        file.into_scenario(constants)
            .with_context(|| format!("Invalid scenario in {}", file_path.display()))
    }
}

fn default_schema_version() -> u32 {
    1
}

/// Serialised form of [`FinancialParams`].
///
/// Version 1 files predate per-carrier escalation rates, so every escalation
/// field is optional here and filled from [`Constants`] during migration.
#[derive(Debug, Clone, Deserialize)]
pub struct FinancialParamsFile {
    /// Real discount rate
    pub discount_rate: Option<f64>,
    /// Appraisal horizon (years)
    pub analysis_period_years: Option<u32>,
    /// Diesel price (per litre)
    pub diesel_price_per_liter: f64,
    /// Electricity price (per kWh)
    pub electricity_price_per_kwh: f64,
    /// Hydrogen price (per kg)
    pub h2_price_per_kg: f64,
    /// Annual escalation of diesel prices
    pub diesel_price_escalation: Option<f64>,
    /// Annual escalation of electricity prices
    pub electricity_price_escalation: Option<f64>,
    /// Annual escalation of hydrogen prices
    pub h2_price_escalation: Option<f64>,
    /// Annual escalation of maintenance costs
    pub maintenance_escalation: Option<f64>,
    /// One-off purchase incentive deducted from capital cost
    #[serde(default)]
    pub capital_grant: f64,
    /// Recurring annual operating incentive
    #[serde(default)]
    pub annual_subsidy: f64,
}

/// Serialised form of [`Scenario`] covering both supported schema versions.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioFile {
    /// Schema version of the record; absent means version 1
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Scenario label
    pub name: String,
    /// The candidate vehicle
    pub vehicle: VehicleSpecs,
    /// The duty cycle
    pub profile: OperationalProfile,
    /// Financial assumptions
    pub financial: FinancialParamsFile,
    /// Technology the candidate is compared against
    pub baseline_technology: Technology,
    /// Annual maintenance cost of the baseline vehicle
    #[serde(default)]
    pub baseline_operating_cost: Option<f64>,
}

impl ScenarioFile {
    /// Migrate to the current schema and validate.
    ///
    /// Version 1 records are upgraded in place: escalation rates, discount
    /// rate and horizon that the old schema could not express are taken from
    /// `constants`. Version 2 records must carry them explicitly.
    pub fn into_scenario(self, constants: &Constants) -> Result<Scenario> {
        let financial = match self.schema_version {
            1 => FinancialParams {
                discount_rate: self.financial.discount_rate.unwrap_or(constants.discount_rate),
                analysis_period_years: self
                    .financial
                    .analysis_period_years
                    .unwrap_or(constants.analysis_period_years),
                diesel_price_per_liter: self.financial.diesel_price_per_liter,
                electricity_price_per_kwh: self.financial.electricity_price_per_kwh,
                h2_price_per_kg: self.financial.h2_price_per_kg,
                diesel_price_escalation: self
                    .financial
                    .diesel_price_escalation
                    .unwrap_or(constants.diesel_price_escalation),
                electricity_price_escalation: self
                    .financial
                    .electricity_price_escalation
                    .unwrap_or(constants.electricity_price_escalation),
                h2_price_escalation: self
                    .financial
                    .h2_price_escalation
                    .unwrap_or(constants.h2_price_escalation),
                maintenance_escalation: self
                    .financial
                    .maintenance_escalation
                    .unwrap_or(constants.maintenance_escalation),
                capital_grant: self.financial.capital_grant,
                annual_subsidy: self.financial.annual_subsidy,
            },
            2 => {
                let f = &self.financial;
                let require = |field: &str, value: Option<f64>| {
                    value.with_context(|| {
                        format!("Version 2 scenarios must specify financial.{field}")
                    })
                };
                FinancialParams {
                    discount_rate: require("discount_rate", f.discount_rate)?,
                    analysis_period_years: f.analysis_period_years.context(
                        "Version 2 scenarios must specify financial.analysis_period_years",
                    )?,
                    diesel_price_per_liter: f.diesel_price_per_liter,
                    electricity_price_per_kwh: f.electricity_price_per_kwh,
                    h2_price_per_kg: f.h2_price_per_kg,
                    diesel_price_escalation: require(
                        "diesel_price_escalation",
                        f.diesel_price_escalation,
                    )?,
                    electricity_price_escalation: require(
                        "electricity_price_escalation",
                        f.electricity_price_escalation,
                    )?,
                    h2_price_escalation: require("h2_price_escalation", f.h2_price_escalation)?,
                    maintenance_escalation: require(
                        "maintenance_escalation",
                        f.maintenance_escalation,
                    )?,
                    capital_grant: f.capital_grant,
                    annual_subsidy: f.annual_subsidy,
                }
            }
            other => bail!("Unsupported scenario schema version {other}"),
        };

        let scenario = Scenario::new(
            self.name,
            self.vehicle,
            self.profile,
            financial,
            self.baseline_technology,
            self.baseline_operating_cost,
        )?;
        Ok(scenario)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{financial, profile, vehicle};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case("diesel", Technology::Diesel)]
    #[case("BEV", Technology::Bev)]
    #[case("hydrogen", Technology::Fcet)]
    #[case("fcet", Technology::Fcet)]
    #[case("Hybrid", Technology::Hybrid)]
    fn test_technology_from_str(#[case] tag: &str, #[case] expected: Technology) {
        assert_eq!(tag.parse::<Technology>().unwrap(), expected);
    }

    #[test]
    fn test_technology_from_str_unknown() {
        assert_eq!(
            "steam".parse::<Technology>(),
            Err(ModelError::UnknownTechnology("steam".into()))
        );
    }

    #[rstest]
    fn test_scenario_new_rejects_bad_vehicle(
        mut vehicle: VehicleSpecs,
        profile: OperationalProfile,
        financial: FinancialParams,
    ) {
        vehicle.mass_kg = -10.0;
        let result = Scenario::new(
            "bad".into(),
            vehicle,
            profile,
            financial,
            Technology::Diesel,
            None,
        );
        assert!(matches!(
            result,
            Err(ModelError::Validation {
                field: "mass_kg",
                ..
            })
        ));
    }

    #[rstest]
    fn test_scenario_new_rejects_negative_baseline_cost(
        vehicle: VehicleSpecs,
        profile: OperationalProfile,
        financial: FinancialParams,
    ) {
        let result = Scenario::new(
            "bad".into(),
            vehicle,
            profile,
            financial,
            Technology::Diesel,
            Some(-1.0),
        );
        assert!(result.is_err());
    }

    const V1_SCENARIO: &str = r#"
        name = "depot A"
        baseline_technology = "diesel"

        [vehicle]
        name = "eTruck 40t"
        technology = "bev"
        mass_kg = 18000
        frontal_area_m2 = 8.0
        drag_coefficient = 1.0
        rolling_resistance = 0.006
        rated_range_km = 350
        capital_cost = 450000
        annual_operating_cost = 12000
        battery_degradation_rate = 0.106

        [profile]
        daily_km = 400
        annual_km = 100000
        operating_days = 250
        average_speed_kmh = 60
        average_grade_rad = 0.0
        utilization = 0.9
        load_factor = 0.8

        [financial]
        diesel_price_per_liter = 1.50
        electricity_price_per_kwh = 0.25
        h2_price_per_kg = 8.0
    "#;

    #[test]
    fn test_v1_scenario_migration_fills_defaults() {
        let constants = Constants::default();
        let file: ScenarioFile = toml::from_str(V1_SCENARIO).unwrap();
        assert_eq!(file.schema_version, 1);

        let scenario = file.into_scenario(&constants).unwrap();
        assert_approx_eq!(f64, scenario.financial.discount_rate, 0.08);
        assert_eq!(scenario.financial.analysis_period_years, 5);
        assert_approx_eq!(f64, scenario.financial.diesel_price_escalation, 0.03);
        assert_approx_eq!(f64, scenario.financial.maintenance_escalation, 0.025);
    }

    #[test]
    fn test_v2_scenario_requires_explicit_rates() {
        let constants = Constants::default();
        let contents = V1_SCENARIO.replace("name = \"depot A\"", "schema_version = 2\nname = \"depot A\"");
        let file: ScenarioFile = toml::from_str(&contents).unwrap();
        assert!(file.into_scenario(&constants).is_err());
    }

    #[test]
    fn test_unsupported_schema_version() {
        let constants = Constants::default();
        let contents = V1_SCENARIO.replace("name = \"depot A\"", "schema_version = 3\nname = \"depot A\"");
        let file: ScenarioFile = toml::from_str(&contents).unwrap();
        assert!(file.into_scenario(&constants).is_err());
    }
}
