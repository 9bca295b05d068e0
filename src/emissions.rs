//! Tailpipe and upstream emissions accounting.
//!
//! Per-trip CO₂ follows the energy draw (grid intensity for electricity, well
//! to tank intensity for hydrogen, combustion factor for diesel). Criteria
//! pollutants (NOₓ, PM) are distance-based Euro VI factors that only apply to
//! powertrains burning diesel.
use crate::constants::Constants;
use crate::error::ModelError;
use crate::physics::EnergyDraw;
use crate::scenario::Technology;
use indexmap::IndexMap;
use itertools::izip;

/// Hydrogen supply chain assumed for upstream CO₂ accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HydrogenSupply {
    /// Electrolytic hydrogen from renewable electricity
    Green,
    /// Steam-reformed hydrogen from natural gas
    Grey,
}

impl HydrogenSupply {
    /// Well-to-tank intensity for this supply chain (kg CO₂ per kg H₂).
    pub fn co2_per_kg(self, constants: &Constants) -> f64 {
        match self {
            HydrogenSupply::Green => constants.green_h2_co2_per_kg,
            HydrogenSupply::Grey => constants.grey_h2_co2_per_kg,
        }
    }
}

/// Emissions over one trip or accounting period.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize)]
pub struct EmissionsTotal {
    /// Carbon dioxide (kg)
    pub co2_kg: f64,
    /// Nitrogen oxides (g)
    pub nox_g: f64,
    /// Particulate matter (g)
    pub pm_g: f64,
}

/// CO₂ attributable to an energy draw, with explicit carrier intensities.
///
/// `h2_co2_per_kg` selects between green and grey hydrogen supply chains.
pub fn co2_for_draw(
    draw: &EnergyDraw,
    grid_co2_per_kwh: f64,
    h2_co2_per_kg: f64,
    diesel_co2_per_liter: f64,
) -> f64 {
    match draw {
        EnergyDraw::Electricity(kwh) => kwh.value() * grid_co2_per_kwh,
        EnergyDraw::Hydrogen(kg) => kg.value() * h2_co2_per_kg,
        EnergyDraw::Diesel(liters) => liters.value() * diesel_co2_per_liter,
        EnergyDraw::Hybrid {
            diesel,
            electricity,
        } => {
            diesel.value() * diesel_co2_per_liter + electricity.value() * grid_co2_per_kwh
        }
    }
}

/// NOₓ emitted over a distance (g). Zero for powertrains with no combustion;
/// halved for hybrids, which run electric for part of the cycle.
pub fn nox_emissions(distance_km: f64, technology: Technology, constants: &Constants) -> f64 {
    match technology {
        Technology::Diesel => distance_km * constants.diesel_nox_per_km,
        Technology::Hybrid => distance_km * constants.diesel_nox_per_km * 0.5,
        Technology::Bev | Technology::Fcet => 0.0,
    }
}

/// PM emitted over a distance (g), same shape as [`nox_emissions`].
pub fn pm_emissions(distance_km: f64, technology: Technology, constants: &Constants) -> f64 {
    match technology {
        Technology::Diesel => distance_km * constants.diesel_pm_per_km,
        Technology::Hybrid => distance_km * constants.diesel_pm_per_km * 0.5,
        Technology::Bev | Technology::Fcet => 0.0,
    }
}

/// All emissions over one trip, assuming green hydrogen supply.
pub fn trip_emissions(
    draw: &EnergyDraw,
    distance_km: f64,
    technology: Technology,
    constants: &Constants,
) -> EmissionsTotal {
    trip_emissions_with_supply(draw, distance_km, technology, HydrogenSupply::Green, constants)
}

/// All emissions over one trip with an explicit hydrogen supply chain.
pub fn trip_emissions_with_supply(
    draw: &EnergyDraw,
    distance_km: f64,
    technology: Technology,
    supply: HydrogenSupply,
    constants: &Constants,
) -> EmissionsTotal {
    EmissionsTotal {
        co2_kg: co2_for_draw(
            draw,
            constants.grid_co2_per_kwh,
            supply.co2_per_kg(constants),
            constants.diesel_co2_per_liter,
        ),
        nox_g: nox_emissions(distance_km, technology, constants),
        pm_g: pm_emissions(distance_km, technology, constants),
    }
}

/// Reduction of `new` relative to `baseline`, as a percentage.
pub fn emission_reduction(baseline_co2: f64, new_co2: f64) -> f64 {
    if baseline_co2 == 0.0 {
        return 0.0;
    }
    (baseline_co2 - new_co2) / baseline_co2 * 100.0
}

/// Fuel use of a fleet, indexed by (fuel, vehicle, period).
///
/// Stored as a flat row-major array so that the emissions contraction runs as
/// slice dot-products rather than triple indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct FuelConsumption {
    values: Vec<f64>,
    fuels: usize,
    vehicles: usize,
    periods: usize,
}

impl FuelConsumption {
    /// Build from a flat row-major array of shape `(fuels, vehicles, periods)`.
    pub fn new(
        values: Vec<f64>,
        fuels: usize,
        vehicles: usize,
        periods: usize,
    ) -> Result<FuelConsumption, ModelError> {
        let expected = fuels * vehicles * periods;
        if values.len() != expected {
            return Err(ModelError::ShapeMismatch {
                left: values.len(),
                right: expected,
            });
        }
        Ok(FuelConsumption {
            values,
            fuels,
            vehicles,
            periods,
        })
    }

    /// Number of fuel types.
    pub fn fuels(&self) -> usize {
        self.fuels
    }
}

/// Per-vehicle, per-period performance loss factors.
#[derive(Debug, Clone, PartialEq)]
pub struct DegradationFactors {
    values: Vec<f64>,
    vehicles: usize,
    periods: usize,
}

impl DegradationFactors {
    /// Build from a flat row-major array of shape `(vehicles, periods)`.
    pub fn new(
        values: Vec<f64>,
        vehicles: usize,
        periods: usize,
    ) -> Result<DegradationFactors, ModelError> {
        let expected = vehicles * periods;
        if values.len() != expected {
            return Err(ModelError::ShapeMismatch {
                left: values.len(),
                right: expected,
            });
        }
        Ok(DegradationFactors {
            values,
            vehicles,
            periods,
        })
    }

    /// Factors that leave consumption unchanged.
    pub fn unity(vehicles: usize, periods: usize) -> DegradationFactors {
        DegradationFactors {
            values: vec![1.0; vehicles * periods],
            vehicles,
            periods,
        }
    }
}

/// Total fleet emissions with degradation: `Σ_f Σ_v Σ_t FC·EF·DF`.
///
/// Each fuel's (vehicle, period) block shares the degradation matrix, so the
/// triple sum collapses to one dot-product per fuel scaled by its emission
/// factor.
pub fn fleet_emissions_with_degradation(
    fuel_consumption: &FuelConsumption,
    emission_factors: &[f64],
    degradation: &DegradationFactors,
) -> Result<f64, ModelError> {
    if emission_factors.len() != fuel_consumption.fuels {
        return Err(ModelError::ShapeMismatch {
            left: emission_factors.len(),
            right: fuel_consumption.fuels,
        });
    }
    if degradation.vehicles != fuel_consumption.vehicles
        || degradation.periods != fuel_consumption.periods
    {
        return Err(ModelError::ShapeMismatch {
            left: degradation.vehicles * degradation.periods,
            right: fuel_consumption.vehicles * fuel_consumption.periods,
        });
    }

    let block_len = fuel_consumption.vehicles * fuel_consumption.periods;
    let total = izip!(
        emission_factors,
        fuel_consumption.values.chunks_exact(block_len)
    )
    .map(|(factor, block)| {
        let dot: f64 = izip!(block, &degradation.values)
            .map(|(consumption, loss)| consumption * loss)
            .sum();
        factor * dot
    })
    .sum();
    Ok(total)
}

/// Fleet emissions part-way through a technology transition.
///
/// `E(t) = E_baseline·(1 − Σ_tech a_tech) + Σ_tech E_tech·a_tech`
///
/// Technologies with a declared emission level but no adoption rate (or vice
/// versa) contribute nothing. Total adoption above 1 is rejected.
pub fn transition_emissions(
    baseline_emissions: f64,
    technology_emissions: &IndexMap<Technology, f64>,
    adoption_rates: &IndexMap<Technology, f64>,
) -> Result<f64, ModelError> {
    let total_adoption: f64 = adoption_rates.values().sum();
    if !(0.0..=1.0).contains(&total_adoption) {
        return Err(ModelError::Validation {
            field: "adoption_rates",
            value: total_adoption,
            reason: "total adoption must be in [0, 1]".into(),
        });
    }

    let remaining_baseline = baseline_emissions * (1.0 - total_adoption);
    let new_technology: f64 = technology_emissions
        .iter()
        .filter_map(|(tech, emissions)| adoption_rates.get(tech).map(|rate| emissions * rate))
        .sum();
    Ok(remaining_baseline + new_technology)
}
