//! This module defines various unit types and their conversions.
//!
//! Quantities are simple wrappers around `f64` so that, for example, a carbon price cannot be
//! accidentally multiplied by a product mass.
use float_cmp::{ApproxEq, F64Margin};
use serde::{Deserialize, Serialize};

macro_rules! unit_struct {
    ($name:ident) => {
        /// Represents a type of quantity.
        #[derive(
            Debug,
            Default,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            Serialize,
            Deserialize,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
            derive_more::Display,
        )]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl $name {
            /// Creates a new instance of the unit type from a f64 value.
            pub fn new(val: f64) -> Self {
                Self(val)
            }

            /// Returns the value of the unit type as a f64.
            pub fn value(self) -> f64 {
                self.0
            }

            /// Returns true if the value is neither infinite nor NaN.
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }

            /// Returns the absolute value.
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }
        }

        impl From<f64> for $name {
            fn from(val: f64) -> Self {
                Self(val)
            }
        }

        impl From<$name> for f64 {
            fn from(val: $name) -> Self {
                val.0
            }
        }

        impl std::iter::Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }

        impl std::ops::Neg for $name {
            type Output = $name;
            fn neg(self) -> $name {
                $name(-self.0)
            }
        }

        impl ApproxEq for $name {
            type Margin = F64Margin;

            fn approx_eq<M: Into<Self::Margin>>(self, other: Self, margin: M) -> bool {
                self.0.approx_eq(other.0, margin)
            }
        }
    };
}

macro_rules! scalable {
    ($name:ident) => {
        impl std::ops::Mul<Dimensionless> for $name {
            type Output = $name;
            fn mul(self, rhs: Dimensionless) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Mul<$name> for Dimensionless {
            type Output = $name;
            fn mul(self, rhs: $name) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Div<Dimensionless> for $name {
            type Output = $name;
            fn div(self, rhs: Dimensionless) -> $name {
                $name(self.0 / rhs.0)
            }
        }

        impl std::ops::Div<$name> for $name {
            type Output = Dimensionless;
            fn div(self, rhs: $name) -> Dimensionless {
                Dimensionless(self.0 / rhs.0)
            }
        }
    };
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 * rhs.0)
            }
        }
        impl std::ops::Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::new(self.0 * lhs.0)
            }
        }
    };
}

macro_rules! impl_div {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Div<$Rhs> for $Lhs {
            type Output = $Out;
            fn div(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 / rhs.0)
            }
        }
    };
}

// Dimensionless
unit_struct!(Dimensionless);

impl std::ops::Mul for Dimensionless {
    type Output = Dimensionless;

    fn mul(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 * rhs.0)
    }
}

impl std::ops::Div for Dimensionless {
    type Output = Dimensionless;

    fn div(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 / rhs.0)
    }
}

// Base quantities
unit_struct!(Tonnes);
unit_struct!(Emissions);
unit_struct!(Money);

// Derived quantities
unit_struct!(EmissionIntensity);
unit_struct!(MoneyPerEmissions);

scalable!(Tonnes);
scalable!(Emissions);
scalable!(Money);
scalable!(EmissionIntensity);
scalable!(MoneyPerEmissions);

// Multiplication rules
impl_mul!(Tonnes, EmissionIntensity, Emissions);
impl_mul!(Emissions, MoneyPerEmissions, Money);

// Division rules
impl_div!(Emissions, Tonnes, EmissionIntensity);
impl_div!(Money, Emissions, MoneyPerEmissions);

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_emissions_from_mass_and_intensity() {
        let emissions = Tonnes(1000.0) * EmissionIntensity(2.07);
        assert_approx_eq!(Emissions, emissions, Emissions(2070.0));

        // Multiplication is commutative across unit types
        let emissions = EmissionIntensity(2.07) * Tonnes(1000.0);
        assert_approx_eq!(Emissions, emissions, Emissions(2070.0));
    }

    #[test]
    fn test_cost_from_emissions_and_price() {
        let cost = Emissions(2070.0) * MoneyPerEmissions(85.0);
        assert_approx_eq!(Money, cost, Money(175_950.0));
        assert_approx_eq!(
            MoneyPerEmissions,
            cost / Emissions(2070.0),
            MoneyPerEmissions(85.0)
        );
    }

    #[test]
    fn test_same_unit_division_is_dimensionless() {
        assert_eq!(Money(50.0) / Money(200.0), Dimensionless(0.25));
    }

    #[test]
    fn test_sum() {
        let total: Money = [Money(1.0), Money(2.5), Money(-0.5)].into_iter().sum();
        assert_eq!(total, Money(3.0));
    }

    #[test]
    fn test_serde_transparent() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Row {
            price: MoneyPerEmissions,
        }

        let row: Row = toml::from_str("price = 85.5").unwrap();
        assert_eq!(row.price, MoneyPerEmissions(85.5));
    }
}
