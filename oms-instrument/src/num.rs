//! Integer-scaled fixed point types.
//!
//! Every price and quantity in the OMS is stored as a signed 64-bit count of ticks.
//! [`TICK_SCALE`] ticks represent one unit of the underlying decimal quantity
//! (`TICK_SCALE == 10_000` means 4 decimal places). Arithmetic on [`Price`]/[`Quantity`]
//! is plain integer arithmetic; conversion to/from human-readable decimals is the only
//! place floating-point-shaped rounding happens, and it is always explicit.
//!
//! A zero-ticks value is the sentinel for "absent" (an empty book side, a flat
//! position's average entry price, ...).

use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use thiserror::Error;

/// Process-wide tick scale: `10_000` ticks per unit, i.e. 4 decimal places.
pub const TICK_SCALE: i64 = 10_000;

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum NumError {
    #[error("value is not finite: {0}")]
    NonFinite(Decimal),
    #[error("value overflows the tick scale: {0}")]
    ScaleOverflow(Decimal),
}

macro_rules! tick_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Sentinel for "absent" (empty book side, flat position, ...).
            pub const ZERO: Self = Self(0);

            pub const fn from_ticks(ticks: i64) -> Self {
                Self(ticks)
            }

            pub const fn ticks(self) -> i64 {
                self.0
            }

            pub fn is_zero(self) -> bool {
                self.0 == 0
            }

            /// Round a decimal amount to the nearest tick and wrap it as `Self`.
            pub fn from_decimal(value: Decimal) -> Result<Self, NumError> {
                let scaled = value * Decimal::from(TICK_SCALE);
                let rounded = scaled.round();
                rounded
                    .to_i64()
                    .map(Self)
                    .ok_or(NumError::ScaleOverflow(value))
            }

            /// Inverse of [`Self::from_decimal`]: exact, since ticks are integral.
            pub fn to_decimal(self) -> Decimal {
                Decimal::from(self.0) / Decimal::from(TICK_SCALE)
            }

            /// Round down to the nearest multiple of `step` ticks (`step > 0`).
            pub fn floor_to(self, step: Self) -> Self {
                debug_assert!(step.0 > 0, "floor_to step must be positive");
                Self((self.0 / step.0) * step.0)
            }

            /// Round up to the nearest multiple of `step` ticks (`step > 0`).
            pub fn ceil_to(self, step: Self) -> Self {
                debug_assert!(step.0 > 0, "ceil_to step must be positive");
                let rem = self.0.rem_euclid(step.0);
                if rem == 0 {
                    self
                } else {
                    Self(self.0 + (step.0 - rem))
                }
            }

            /// True if `self` is an exact multiple of `step`.
            pub fn is_aligned_to(self, step: Self) -> bool {
                step.0 != 0 && self.0 % step.0 == 0
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl SubAssign for $name {
            fn sub_assign(&mut self, rhs: Self) {
                self.0 -= rhs.0;
            }
        }

        impl Neg for $name {
            type Output = Self;
            fn neg(self) -> Self {
                Self(-self.0)
            }
        }

        impl Mul<i64> for $name {
            type Output = Self;
            fn mul(self, rhs: i64) -> Self {
                Self(self.0 * rhs)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.to_decimal())
            }
        }
    };
}

tick_newtype!(
    /// A price, stored as a signed count of ticks (see [`TICK_SCALE`]).
    Price
);
tick_newtype!(
    /// A quantity, stored as a signed count of ticks.
    ///
    /// Most quantities in this system are non-negative, but [`Quantity`] stays signed so
    /// that position deltas and hedge pending-exposure accumulators (which are genuinely
    /// signed) can reuse the same arithmetic without an extra wrapper type.
    Quantity
);

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn decimal_round_trip_is_exact_at_tick_scale() {
        let p = Price::from_decimal(dec!(50123.4567)).unwrap();
        assert_eq!(p.to_decimal(), dec!(50123.4567));
    }

    #[test]
    fn decimal_conversion_rounds_to_nearest_tick() {
        // 1/3 of a tick rounds down, 2/3 rounds up.
        let a = Price::from_decimal(dec!(1.00001)).unwrap();
        assert_eq!(a, Price::from_ticks(10000));
        let b = Price::from_decimal(dec!(1.000051)).unwrap();
        assert_eq!(b, Price::from_ticks(10001));
    }

    #[test]
    fn floor_and_ceil_to_step() {
        let step = Price::from_ticks(100);
        assert_eq!(Price::from_ticks(250).floor_to(step), Price::from_ticks(200));
        assert_eq!(Price::from_ticks(250).ceil_to(step), Price::from_ticks(300));
        assert_eq!(Price::from_ticks(300).ceil_to(step), Price::from_ticks(300));
    }

    #[test]
    fn zero_is_sentinel() {
        assert!(Price::ZERO.is_zero());
        assert!(Quantity::default().is_zero());
    }
}
