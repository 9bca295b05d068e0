//! Physics-based energy consumption models.
//!
//! Wheel energy is the sum of three additive terms (climbing work, rolling
//! resistance, aerodynamic drag). Technology-specific draw divides the wheel
//! energy by the powertrain efficiency chain and converts to the carrier's
//! natural billing unit.
use crate::constants::Constants;
use crate::scenario::{FinancialParams, OperationalProfile, Technology, VehicleSpecs};
use crate::units::{Joules, KilogramsHydrogen, KilowattHours, Liters, Money};

/// Parameters of the resistive forces acting on a vehicle body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyParams {
    /// Gravitational acceleration (m/s²)
    pub gravity_ms2: f64,
    /// Air density (kg/m³)
    pub air_density_kgm3: f64,
    /// Frontal area (m²)
    pub frontal_area_m2: f64,
    /// Aerodynamic drag coefficient
    pub drag_coefficient: f64,
    /// Rolling resistance coefficient
    pub rolling_resistance: f64,
}

impl BodyParams {
    /// Body parameters for a generic truck profile.
    pub fn from_constants(constants: &Constants) -> BodyParams {
        BodyParams {
            gravity_ms2: constants.gravity_ms2,
            air_density_kgm3: constants.air_density_kgm3,
            frontal_area_m2: constants.frontal_area_m2,
            drag_coefficient: constants.drag_coefficient,
            rolling_resistance: constants.rolling_resistance,
        }
    }

    /// Body parameters for a specific vehicle, with ambient conditions from
    /// the shared constants.
    pub fn from_vehicle(specs: &VehicleSpecs, constants: &Constants) -> BodyParams {
        BodyParams {
            gravity_ms2: constants.gravity_ms2,
            air_density_kgm3: constants.air_density_kgm3,
            frontal_area_m2: specs.frontal_area_m2,
            drag_coefficient: specs.drag_coefficient,
            rolling_resistance: specs.rolling_resistance,
        }
    }
}

/// Energy drawn from the on-board store, in the carrier's billing unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnergyDraw {
    /// Charger-side electricity (kWh)
    Electricity(KilowattHours),
    /// Compressed hydrogen (kg)
    Hydrogen(KilogramsHydrogen),
    /// Diesel fuel (L)
    Diesel(Liters),
    /// A hybrid draws from both stores at the declared split
    Hybrid {
        /// Diesel side of the split
        diesel: Liters,
        /// Electric side of the split
        electricity: KilowattHours,
    },
}

/// Energy consumed at the wheel over a trip.
///
/// `E_wheel = m·g·sin(θ)·d + C_rr·m·g·d + ½·C_d·ρ·A·v²·d`
///
/// Distance is in metres and velocity in m/s. At zero grade and zero velocity
/// only the rolling term remains.
pub fn wheel_energy(
    mass_kg: f64,
    grade_rad: f64,
    distance_m: f64,
    velocity_ms: f64,
    body: &BodyParams,
) -> Joules {
    let climbing = mass_kg * body.gravity_ms2 * grade_rad.sin() * distance_m;
    let rolling = body.rolling_resistance * mass_kg * body.gravity_ms2 * distance_m;
    let aero = 0.5
        * body.drag_coefficient
        * body.air_density_kgm3
        * body.frontal_area_m2
        * velocity_ms.powi(2)
        * distance_m;
    Joules(climbing + rolling + aero)
}

/// Convert wheel energy to the store-side draw for a powertrain.
///
/// BEV and FCET divide by the drivetrain efficiency and the store's own
/// conversion efficiency; diesel uses a single tank-to-wheel figure. A hybrid
/// splits the wheel energy between the two paths at the declared fuel split
/// before applying the blended efficiency to each side.
pub fn technology_specific_energy(
    wheel: Joules,
    technology: Technology,
    constants: &Constants,
) -> EnergyDraw {
    match technology {
        Technology::Bev => {
            let store = wheel
                / (constants.drivetrain_efficiency * constants.battery_charging_efficiency);
            EnergyDraw::Electricity(store.to_kilowatt_hours())
        }
        Technology::Fcet => {
            let store = wheel / (constants.drivetrain_efficiency * constants.fuelcell_efficiency);
            let kwh = store.to_kilowatt_hours();
            EnergyDraw::Hydrogen(KilogramsHydrogen(kwh.value() / constants.kwh_per_kg_h2))
        }
        Technology::Diesel => {
            let store = wheel / constants.diesel_efficiency;
            let kwh = store.to_kilowatt_hours();
            EnergyDraw::Diesel(Liters(kwh.value() / constants.kwh_per_liter_diesel))
        }
        Technology::Hybrid => {
            let store = wheel / constants.hybrid_efficiency;
            let kwh = store.to_kilowatt_hours();
            let diesel_share = kwh.value() * constants.hybrid_fuel_split;
            let electric_share = kwh.value() - diesel_share;
            EnergyDraw::Hybrid {
                diesel: Liters(diesel_share / constants.kwh_per_liter_diesel),
                electricity: KilowattHours(electric_share),
            }
        }
    }
}

/// Geometry and loading of one trip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trip {
    /// Distance driven (km)
    pub distance_km: f64,
    /// Average speed (km/h)
    pub speed_kmh: f64,
    /// Gross vehicle mass (kg)
    pub mass_kg: f64,
    /// Average road grade (radians)
    pub grade_rad: f64,
}

/// Store-side energy draw for a complete trip.
///
/// Adds the auxiliary (HVAC and electronics) load over the trip time to the
/// wheel energy and inflates the total by the temperature factor before the
/// powertrain conversion. `temperature_factor` is 1.0 in mild conditions and
/// drops towards 0.5 in extreme heat or cold.
pub fn trip_energy(
    trip: &Trip,
    technology: Technology,
    temperature_factor: f64,
    body: &BodyParams,
    constants: &Constants,
) -> EnergyDraw {
    let distance_m = trip.distance_km * 1000.0;
    let velocity_ms = trip.speed_kmh / 3.6;
    let trip_time_hours = trip.distance_km / trip.speed_kmh;

    let wheel = wheel_energy(trip.mass_kg, trip.grade_rad, distance_m, velocity_ms, body);
    let auxiliary = Joules(constants.auxiliary_power_kw * 1000.0 * trip_time_hours * 3600.0);
    let adjusted = (wheel + auxiliary) / temperature_factor;

    technology_specific_energy(adjusted, technology, constants)
}

/// Store-side draw for one year of the given duty cycle.
pub fn annual_energy(
    vehicle: &VehicleSpecs,
    profile: &OperationalProfile,
    technology: Technology,
    temperature_factor: f64,
    constants: &Constants,
) -> EnergyDraw {
    let body = BodyParams::from_vehicle(vehicle, constants);
    let trip = Trip {
        distance_km: profile.effective_annual_km(),
        speed_kmh: profile.average_speed_kmh,
        mass_kg: vehicle.mass_kg,
        grade_rad: profile.average_grade_rad,
    };
    trip_energy(&trip, technology, temperature_factor, &body, constants)
}

/// Cost of an energy draw at the scenario's prices.
pub fn energy_cost(draw: &EnergyDraw, financial: &FinancialParams) -> Money {
    let cost = match draw {
        EnergyDraw::Electricity(kwh) => kwh.value() * financial.electricity_price_per_kwh,
        EnergyDraw::Hydrogen(kg) => kg.value() * financial.h2_price_per_kg,
        EnergyDraw::Diesel(liters) => liters.value() * financial.diesel_price_per_liter,
        EnergyDraw::Hybrid {
            diesel,
            electricity,
        } => {
            diesel.value() * financial.diesel_price_per_liter
                + electricity.value() * financial.electricity_price_per_kwh
        }
    };
    Money(cost)
}

/// Energy recovered by regenerative braking between two speeds (m/s).
///
/// Returns zero when the final speed exceeds the initial one.
pub fn regenerative_braking_energy(
    mass_kg: f64,
    initial_velocity_ms: f64,
    final_velocity_ms: f64,
    regen_efficiency: f64,
) -> Joules {
    let delta_kinetic =
        0.5 * mass_kg * (initial_velocity_ms.powi(2) - final_velocity_ms.powi(2));
    Joules((delta_kinetic * regen_efficiency).max(0.0))
}

/// Specific energy consumption in kWh per 100 km per tonne.
pub fn specific_energy_consumption(total: Joules, distance_km: f64, mass_kg: f64) -> f64 {
    let energy_kwh = total.to_kilowatt_hours().value();
    let mass_tonnes = mass_kg / 1000.0;
    (energy_kwh / distance_km * 100.0) / mass_tonnes
}
