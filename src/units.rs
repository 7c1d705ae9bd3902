//! CO2e quantity types.
//!
//! Kilograms and tonnes are separate types so a factor-table result in kg
//! cannot be mixed into a scope total in tonnes without an explicit
//! conversion at the boundary.

use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

/// Kilograms of CO2-equivalent.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KgCo2e(pub f64);

/// Tonnes of CO2-equivalent.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TonnesCo2e(pub f64);

impl KgCo2e {
    pub fn value(self) -> f64 {
        self.0
    }

    pub fn to_tonnes(self) -> TonnesCo2e {
        TonnesCo2e(self.0 / 1000.0)
    }
}

impl TonnesCo2e {
    pub fn value(self) -> f64 {
        self.0
    }

    pub fn to_kg(self) -> KgCo2e {
        KgCo2e(self.0 * 1000.0)
    }

    pub fn is_valid_quantity(self) -> bool {
        self.0.is_finite() && self.0 >= 0.0
    }
}

impl Add for KgCo2e {
    type Output = KgCo2e;
    fn add(self, rhs: KgCo2e) -> KgCo2e {
        KgCo2e(self.0 + rhs.0)
    }
}

impl Add for TonnesCo2e {
    type Output = TonnesCo2e;
    fn add(self, rhs: TonnesCo2e) -> TonnesCo2e {
        TonnesCo2e(self.0 + rhs.0)
    }
}

impl Sub for TonnesCo2e {
    type Output = TonnesCo2e;
    fn sub(self, rhs: TonnesCo2e) -> TonnesCo2e {
        TonnesCo2e(self.0 - rhs.0)
    }
}

impl AddAssign for TonnesCo2e {
    fn add_assign(&mut self, rhs: TonnesCo2e) {
        self.0 += rhs.0;
    }
}

impl Sum for TonnesCo2e {
    fn sum<I: Iterator<Item = TonnesCo2e>>(iter: I) -> TonnesCo2e {
        iter.fold(TonnesCo2e(0.0), |acc, t| acc + t)
    }
}
