//! Error conditions reported by the modelling core.
//!
//! Constructor-time checks on scenario records return [`ModelError`] so that a
//! caller can tell which field was rejected and why. Coarser orchestration
//! failures are reported through `anyhow` at the call sites that hit them.
use std::error::Error;
use std::fmt;

/// An error raised while constructing or evaluating model inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A numeric field failed a validity check.
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// The value that was rejected.
        value: f64,
        /// Human-readable description of the constraint that was broken.
        reason: String,
    },
    /// A technology tag did not match any known powertrain class.
    UnknownTechnology(String),
    /// Two sequences that must be combined element-wise have different lengths.
    ShapeMismatch {
        /// Length of the first operand.
        left: usize,
        /// Length of the second operand.
        right: usize,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ModelError::Validation {
                field,
                value,
                reason,
            } => {
                write!(f, "Invalid value {value} for field '{field}': {reason}")
            }
            ModelError::UnknownTechnology(tag) => write!(f, "Unknown technology '{tag}'"),
            ModelError::ShapeMismatch { left, right } => {
                write!(f, "Mismatched sequence lengths: {left} vs. {right}")
            }
        }
    }
}

impl Error for ModelError {}
