//! Token amounts.
//!
//! Balances are fractional (fees default to 0.01), so amounts are `f64`.
//! Consistency checks compare with a tolerance (`ProtocolParams::balance_tolerance`)
//! rather than exact equality.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use crate::TypesError;

/// An amount of the ledger's native token.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(f64);

impl Amount {
    pub const ZERO: Self = Self(0.0);

    pub fn new(value: f64) -> Self {
        Self(value)
    }

    /// Rejects NaN and infinities, which would poison balance arithmetic.
    pub fn try_new(value: f64) -> Result<Self, TypesError> {
        if value.is_finite() {
            Ok(Self(value))
        } else {
            Err(TypesError::InvalidAmount(value))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0.0
    }

    /// Whether `self` and `other` differ by at most `tolerance`.
    pub fn approx_eq(&self, other: Amount, tolerance: f64) -> bool {
        (self.0 - other.0).abs() <= tolerance
    }

    /// Canonical textual form used in hash preimages.
    ///
    /// Shortest round-trip representation; integral values keep a trailing
    /// `.0` so `1000.0` and `1000` never collide with an integer field.
    pub fn canonical(&self) -> String {
        canonical_float(self.0)
    }
}

/// Shortest round-trip decimal form of `v`, with `.0` appended to integral values.
pub fn canonical_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

impl Add for Amount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl From<f64> for Amount {
    fn from(v: f64) -> Self {
        Self(v)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
