//! Physical dimensions as products of units raised to real powers.
//!
//! A [`Dimension`] maps unit symbols to exponents. It is parsed from strings
//! such as `"m^2*s^-1"` and combined when operators multiply, divide or raise
//! features to a power.
//!
//! Exponents whose magnitude falls below [`TOLERANCE`] are erased after every
//! mutation, so a dimensionless quantity is always the empty map.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Exponents closer than this are considered equal (and erased near zero).
pub const TOLERANCE: f64 = 1e-5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dimension {
    units: BTreeMap<String, f64>,
}

impl Dimension {
    /// The dimensionless unit.
    pub fn dimensionless() -> Self {
        Self::default()
    }

    pub fn is_dimensionless(&self) -> bool {
        self.units.is_empty()
    }

    /// Exponent of `unit`, if present.
    pub fn get(&self, unit: &str) -> Option<f64> {
        self.units.get(unit).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.units.iter().map(|(unit, &power)| (unit.as_str(), power))
    }

    fn add_factor(&mut self, unit: &str, power: f64) {
        *self.units.entry(unit.to_string()).or_insert(0.0) += power;
    }

    fn erase_zeros(&mut self) {
        self.units
            .retain(|unit, power| !unit.is_empty() && power.abs() >= TOLERANCE);
    }

    /// Multiplies by `other` (adds exponents).
    pub fn add(&mut self, other: &Dimension) {
        for (unit, &power) in &other.units {
            self.add_factor(unit, power);
        }
        self.erase_zeros();
    }

    /// Divides by `other` (subtracts exponents).
    pub fn subtract(&mut self, other: &Dimension) {
        for (unit, &power) in &other.units {
            self.add_factor(unit, -power);
        }
        self.erase_zeros();
    }

    pub fn raise_to_power(&mut self, p: f64) {
        for power in self.units.values_mut() {
            *power *= p;
        }
        self.erase_zeros();
    }

    /// Checks that every unit of `self` appears in `other` with the same
    /// exponent. With `symmetric`, the reverse inclusion is checked as well.
    pub fn matches(&self, other: &Dimension, symmetric: bool) -> bool {
        let forward = self.units.iter().all(|(unit, &power)| {
            other
                .units
                .get(unit)
                .is_some_and(|&p| (p - power).abs() <= TOLERANCE)
        });
        if symmetric {
            forward && other.matches(self, false)
        } else {
            forward
        }
    }
}

impl FromStr for Dimension {
    type Err = Error;

    /// Parses `unit[^power](*unit[^power])*`. Empty units are dropped, so
    /// `""` is dimensionless.
    fn from_str(s: &str) -> Result<Self> {
        let mut dim = Dimension::default();
        for field in s.split('*') {
            let (unit, power) = match field.split_once('^') {
                None => (field.trim(), 1.0),
                Some((unit, power)) => {
                    let unit = unit.trim();
                    let power = power.trim().parse::<f64>().map_err(|_| Error::InvalidPower {
                        unit: unit.to_string(),
                        power: power.to_string(),
                    })?;
                    (unit, power)
                }
            };
            dim.add_factor(unit, power);
        }
        dim.erase_zeros();
        Ok(dim)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.units.is_empty() {
            return write!(f, "1");
        }
        for (i, (unit, power)) in self.units.iter().enumerate() {
            if i > 0 {
                write!(f, "*")?;
            }
            write!(f, "{}^{}", unit, power)?;
        }
        Ok(())
    }
}
