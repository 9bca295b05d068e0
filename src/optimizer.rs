//! Fleet technology mix selection.
//!
//! A single-pass greedy heuristic: filter candidates by range, pick the
//! cheapest survivor, then scale its adoption back if the charging or
//! refuelling infrastructure cannot serve the implied vehicle count. Diesel
//! absorbs whatever the chosen technology cannot cover. This is deliberately
//! not an LP formulation.
use crate::scenario::Technology;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use log::{info, warn};

/// One technology option offered to the optimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct TechnologyCandidate {
    /// Powertrain class
    pub technology: Technology,
    /// Purchase cost per vehicle
    pub capital_cost: f64,
    /// Lifetime maintenance cost per vehicle
    pub maintenance_cost: f64,
    /// Lifetime degradation (replacement and refurbishment) cost per vehicle
    pub degradation_cost: f64,
    /// Operational range (km)
    pub range_km: f64,
    /// Payload capacity per vehicle (kg)
    pub load_capacity_kg: f64,
}

impl TechnologyCandidate {
    fn total_cost(&self) -> f64 {
        self.capital_cost + self.maintenance_cost + self.degradation_cost
    }
}

/// Fleet-level constraints on the mix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FleetRequirements {
    /// Minimum operational range a candidate must offer (km)
    pub required_range_km: f64,
    /// Total payload the fleet must move (kg)
    pub total_demand_kg: f64,
    /// Charging or refuelling slots available for the new technology
    pub infrastructure_slots: u32,
    /// Cap on the new technology's share, if policy imposes one
    pub max_adoption: Option<f64>,
}

/// Choose the fleet mix as allocation fractions per technology.
///
/// Every candidate technology appears in the result, at 0.0 if unused. When
/// infrastructure limits the winner's share and no diesel candidate exists to
/// absorb the remainder, the mix sums to less than one and a warning is
/// logged.
pub fn select_technology_mix(
    candidates: &[TechnologyCandidate],
    requirements: &FleetRequirements,
) -> Result<IndexMap<Technology, f64>> {
    ensure!(
        !candidates.is_empty(),
        "Technology mix selection needs at least one candidate"
    );
    ensure!(
        requirements.total_demand_kg > 0.0,
        "Total fleet demand must be positive (got {})",
        requirements.total_demand_kg
    );

    let best = candidates
        .iter()
        .filter(|candidate| candidate.range_km >= requirements.required_range_km)
        .min_by(|a, b| a.total_cost().total_cmp(&b.total_cost()))
        .with_context(|| {
            format!(
                "No candidate technology meets the {} km range requirement",
                requirements.required_range_km
            )
        })?;
    ensure!(
        best.load_capacity_kg > 0.0,
        "Candidate '{}' has no load capacity",
        best.technology
    );

    let adoption_cap = requirements.max_adoption.unwrap_or(1.0).clamp(0.0, 1.0);
    let vehicles_needed = (requirements.total_demand_kg / best.load_capacity_kg).ceil();
    let infrastructure_fraction = f64::from(requirements.infrastructure_slots) / vehicles_needed;
    let adoption = adoption_cap.min(infrastructure_fraction).min(1.0);

    let mut mix: IndexMap<Technology, f64> = candidates
        .iter()
        .map(|candidate| (candidate.technology, 0.0))
        .collect();
    mix[&best.technology] = adoption;

    let remainder = 1.0 - adoption;
    if remainder > 0.0 {
        if let Some(diesel_share) = mix.get_mut(&Technology::Diesel) {
            *diesel_share += remainder;
        } else {
            warn!(
                "No diesel fallback candidate: {:.0}% of the fleet is unallocated",
                remainder * 100.0
            );
        }
    }

    info!(
        "Selected {} at {:.0}% adoption ({vehicles_needed} vehicles for {} kg demand)",
        best.technology,
        adoption * 100.0,
        requirements.total_demand_kg
    );
    Ok(mix)
}
