//! Core modelling stack for heavy truck fleet decarbonisation analysis.
//!
//! The crate estimates the technical, economic and environmental outcomes of
//! replacing diesel trucks with battery-electric, hydrogen fuel-cell or hybrid
//! powertrains. It exposes pure in-process function contracts only; data
//! loading, report generation and transport layers are external collaborators.
#![warn(missing_docs)]
pub mod analysis;
pub mod constants;
pub mod degradation;
pub mod economics;
pub mod emissions;
pub mod error;
pub mod log;
pub mod optimizer;
pub mod physics;
pub mod scenario;
pub mod simulation;
pub mod units;
pub mod validation;

#[cfg(test)]
mod fixture;
