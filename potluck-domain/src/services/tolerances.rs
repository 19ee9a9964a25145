use std::{env, str::FromStr};

use rust_decimal::Decimal;
use thiserror::Error;

use crate::model::Money;

pub const REMOVAL_TOLERANCE_VAR: &str = "POTLUCK_REMOVAL_TOLERANCE";
pub const CLASSIFICATION_EPSILON_VAR: &str = "POTLUCK_CLASSIFICATION_EPSILON";

/// A settling participant whose remaining balance drops below this is done.
pub const SETTLEMENT_REMOVAL_TOLERANCE: Money =
    Money::from_decimal(Decimal::from_parts(1, 0, 0, false, 1));

/// Payments smaller than this are not recorded at all.
pub const MIN_RECORDED_EXPENSE: Money =
    Money::from_decimal(Decimal::from_parts(1, 0, 0, false, 1));

/// Allowed drift of the balance sum before a pass is reported as unbalanced.
pub const CONSERVATION_TOLERANCE: Money =
    Money::from_decimal(Decimal::from_parts(1, 0, 0, false, 2));

/// Balances within this distance of zero are neither owed nor owing.
pub const CLASSIFICATION_EPSILON: Money = Money::ZERO;

/// Numeric thresholds used by a settlement pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettlementTolerances {
    /// Remaining balance below which a matched participant leaves the queue.
    pub removal: Money,
    /// Half-width of the band around zero that is classified as settled.
    pub classification_epsilon: Money,
    /// Balance-sum drift tolerated without a warning.
    pub conservation: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToleranceConfigError {
    #[error("{variable} must be a non-negative decimal, got '{value}'")]
    Invalid {
        variable: &'static str,
        value: String,
    },
    #[error("{variable} must be greater than zero, got '{value}'")]
    NotPositive {
        variable: &'static str,
        value: String,
    },
}

impl SettlementTolerances {
    /// Defaults overridden by `POTLUCK_REMOVAL_TOLERANCE` and
    /// `POTLUCK_CLASSIFICATION_EPSILON` when set.
    pub fn from_env() -> Result<Self, ToleranceConfigError> {
        Self::from_lookup(|variable| env::var(variable).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ToleranceConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut tolerances = Self::default();
        // a zero removal tolerance would never retire a participant left at zero
        if let Some(removal) = parse_tolerance(&lookup, REMOVAL_TOLERANCE_VAR, false)? {
            tolerances.removal = removal;
        }
        if let Some(epsilon) = parse_tolerance(&lookup, CLASSIFICATION_EPSILON_VAR, true)? {
            tolerances.classification_epsilon = epsilon;
        }
        Ok(tolerances)
    }
}

fn parse_tolerance<F>(
    lookup: &F,
    variable: &'static str,
    zero_allowed: bool,
) -> Result<Option<Money>, ToleranceConfigError>
where
    F: Fn(&'static str) -> Option<String>,
{
    let Some(raw) = lookup(variable) else {
        return Ok(None);
    };
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    match Decimal::from_str(value).map(Money::from_decimal) {
        Ok(parsed) if parsed.is_zero() && !zero_allowed => {
            Err(ToleranceConfigError::NotPositive {
                variable,
                value: raw,
            })
        }
        Ok(parsed) if !parsed.is_negative() => Ok(Some(parsed)),
        _ => Err(ToleranceConfigError::Invalid {
            variable,
            value: raw,
        }),
    }
}

impl Default for SettlementTolerances {
    fn default() -> Self {
        Self {
            removal: SETTLEMENT_REMOVAL_TOLERANCE,
            classification_epsilon: CLASSIFICATION_EPSILON,
            conservation: CONSERVATION_TOLERANCE,
        }
    }
}
