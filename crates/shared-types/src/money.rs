//! Money as integer minor units.
//!
//! Amounts never touch floating point: the gateway wants minor units
//! (sen) anyway, and order bookkeeping must compare amounts exactly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported settlement currencies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// Malaysian Ringgit.
    #[default]
    Myr,
}

impl Currency {
    /// ISO 4217 code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Myr => "MYR",
        }
    }

    /// Minor units per major unit (sen per ringgit).
    pub fn minor_per_major(&self) -> i64 {
        100
    }
}

/// An exact amount in minor units of a currency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in minor units (sen).
    pub minor: i64,
    /// Settlement currency.
    pub currency: Currency,
}

impl Money {
    /// Amount from minor units.
    pub fn from_minor(minor: i64, currency: Currency) -> Self {
        Self { minor, currency }
    }

    /// Amount from whole major units (`Money::from_major(20, Myr)` is RM20).
    pub fn from_major(major: i64, currency: Currency) -> Self {
        Self {
            minor: major * currency.minor_per_major(),
            currency,
        }
    }

    /// Minor units, as the gateway wire format wants them.
    pub fn minor_units(&self) -> i64 {
        self.minor
    }

    /// True for zero-cost plans (trials).
    pub fn is_zero(&self) -> bool {
        self.minor == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let per = self.currency.minor_per_major();
        write!(
            f,
            "{} {}.{:02}",
            self.currency.code(),
            self.minor / per,
            (self.minor % per).abs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_major() {
        let m = Money::from_major(20, Currency::Myr);
        assert_eq!(m.minor_units(), 2000);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_minor(2000, Currency::Myr).to_string(), "MYR 20.00");
        assert_eq!(Money::from_minor(2050, Currency::Myr).to_string(), "MYR 20.50");
        assert_eq!(Money::from_minor(5, Currency::Myr).to_string(), "MYR 0.05");
    }

    #[test]
    fn test_zero_for_trial() {
        assert!(Money::from_minor(0, Currency::Myr).is_zero());
        assert!(!Money::from_minor(1, Currency::Myr).is_zero());
    }
}
