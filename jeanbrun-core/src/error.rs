//! Error kinds raised by the calculation engine.
//!
//! Two families exist. [`ValidationError`] means the input itself is
//! malformed or out of range and the calculation cannot proceed.
//! [`EligibilityError`] means the input is well formed but a domain rule
//! excludes it from a scheme (renovation threshold, Micro-BIC ceiling, zone).

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{NiveauLoyer, RentalCategory, ZoneFiscale};

/// Malformed or out-of-range input. Aborts the whole simulation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must be non-negative, got {value}")]
    NegativeAmount { field: &'static str, value: Decimal },

    #[error("{field} must be at most {max}, got {value}")]
    AmountTooLarge {
        field: &'static str,
        value: Decimal,
        max: Decimal,
    },

    #[error("{field} must be between 0 and 1, got {value}")]
    RateOutOfRange { field: &'static str, value: Decimal },

    #[error("number of parts must be positive, got {0}")]
    NonPositiveParts(Decimal),

    #[error("number of parts must be a multiple of 0.25, got {0}")]
    FractionalParts(Decimal),

    #[error("no tax brackets provided")]
    NoTaxBrackets,

    #[error("first tax bracket must start at 0, starts at {0}")]
    BracketsMustStartAtZero(Decimal),

    #[error("tax brackets are not contiguous at {0}")]
    BracketGap(Decimal),

    #[error("last tax bracket must be open-ended")]
    LastBracketNotOpen,

    #[error("property component shares must sum to 1, got {0}")]
    InvalidComponentShares(Decimal),

    #[error("no Micro-BIC allowance configured for category {0}")]
    MissingAllowance(RentalCategory),

    #[error("{field} must be at most {max} years, got {value}")]
    DurationTooLong {
        field: &'static str,
        value: u32,
        max: u32,
    },

    #[error("loan duration must be positive when a loan amount is set")]
    ZeroLoanDuration,

    #[error("deferral must be at most {max} months, got {value}")]
    DeferralTooLong { value: u32, max: u32 },

    #[error("holding duration must be at least one year")]
    ZeroHoldingDuration,
}

/// Well-formed input that a scheme's rules exclude.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EligibilityError {
    #[error("renovation works of {travaux} are below the required {required}")]
    TravauxBelowThreshold { travaux: Decimal, required: Decimal },

    #[error("rental revenue {revenue} exceeds the Micro-BIC ceiling of {ceiling} for {category}")]
    MicroBicCeilingExceeded {
        category: RentalCategory,
        revenue: Decimal,
        ceiling: Decimal,
    },

    #[error("zone {0} is not eligible")]
    ZoneNotEligible(ZoneFiscale),

    #[error("holding duration of {years} years is below the minimum of {minimum} years")]
    HoldingTooShort { years: u32, minimum: u32 },

    #[error("no reduction rate for zone {zone} at rent level {niveau}")]
    NoRateTier { zone: ZoneFiscale, niveau: NiveauLoyer },
}

/// Any failure from a calculator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SimulationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Eligibility(#[from] EligibilityError),
}

/// Largest amount (or surface) accepted on input: ten billion.
///
/// Keeps every sum, product and compounded value the calculators derive
/// from an input well inside `Decimal`'s range.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

/// Checks that `value` lies in `[0, MAX_AMOUNT]`.
pub(crate) fn ensure_amount(
    field: &'static str,
    value: Decimal,
) -> Result<(), ValidationError> {
    if value < Decimal::ZERO {
        return Err(ValidationError::NegativeAmount { field, value });
    }
    if value > MAX_AMOUNT {
        return Err(ValidationError::AmountTooLarge {
            field,
            value,
            max: MAX_AMOUNT,
        });
    }
    Ok(())
}

/// Checks that `value` lies in `[0, 1]`.
pub(crate) fn ensure_rate(
    field: &'static str,
    value: Decimal,
) -> Result<(), ValidationError> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(ValidationError::RateOutOfRange { field, value });
    }
    Ok(())
}
