//! Unit newtypes used at the boundaries of the physics and energy modules.
//!
//! Wrapping raw `f64`s keeps joules from being silently added to litres when
//! energy draws for different carriers flow through the same code paths.
#![allow(missing_docs)]
use derive_more::{Add, Sub};
use serde::{Deserialize, Serialize};

/// Conversion factor between the SI and billing units of energy.
pub const JOULES_PER_KILOWATT_HOUR: f64 = 3.6e6;

macro_rules! unit_struct {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize, Add, Sub,
        )]
        pub struct $name(pub f64);

        impl $name {
            /// The underlying value as a bare float.
            pub fn value(self) -> f64 {
                self.0
            }

            /// Whether the value is finite (not NaN or infinite).
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl std::ops::Mul<f64> for $name {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self {
                Self(self.0 * rhs)
            }
        }

        impl std::ops::Div<f64> for $name {
            type Output = Self;
            fn div(self, rhs: f64) -> Self {
                Self(self.0 / rhs)
            }
        }

        /// Dividing two like quantities yields a dimensionless ratio.
        impl std::ops::Div<$name> for $name {
            type Output = f64;
            fn div(self, rhs: $name) -> f64 {
                self.0 / rhs.0
            }
        }

        impl float_cmp::ApproxEq for $name {
            type Margin = float_cmp::F64Margin;

            fn approx_eq<M: Into<Self::Margin>>(self, other: Self, margin: M) -> bool {
                self.0.approx_eq(other.0, margin.into())
            }
        }
    };
}

unit_struct!(Joules);
unit_struct!(KilowattHours);
unit_struct!(Liters);
unit_struct!(KilogramsHydrogen);
unit_struct!(Money);

impl Joules {
    /// Convert an energy in joules to kilowatt-hours.
    pub fn to_kilowatt_hours(self) -> KilowattHours {
        KilowattHours(self.0 / JOULES_PER_KILOWATT_HOUR)
    }
}

impl KilowattHours {
    /// Convert an energy in kilowatt-hours to joules.
    pub fn to_joules(self) -> Joules {
        Joules(self.0 * JOULES_PER_KILOWATT_HOUR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_kwh_joules_round_trip() {
        let energy = KilowattHours(125.0);
        assert_approx_eq!(KilowattHours, energy.to_joules().to_kilowatt_hours(), energy);
        assert_approx_eq!(Joules, KilowattHours(1.0).to_joules(), Joules(3.6e6));
    }

    #[test]
    fn test_unit_arithmetic() {
        assert_approx_eq!(Joules, Joules(2.0) + Joules(3.0), Joules(5.0));
        assert_approx_eq!(Money, Money(10.0) - Money(4.0), Money(6.0));
        assert_approx_eq!(KilowattHours, KilowattHours(100.0) * 0.5, KilowattHours(50.0));
        assert_approx_eq!(f64, Liters(30.0) / Liters(10.0), 3.0);
    }
}
