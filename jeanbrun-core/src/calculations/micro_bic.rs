//! Micro-BIC flat-rate allowance.
//!
//! Under Micro-BIC the taxable income is the rental revenue minus a fixed
//! allowance that depends on the rental category. Revenue above the
//! category's ceiling is an eligibility failure; it does not silently switch
//! the investor to the réel regime.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculations::common::round_half_up;
use crate::error::{EligibilityError, SimulationError, ValidationError, ensure_amount};
use crate::{MicroBicAllowance, RentalCategory};

/// Taxable revenue under Micro-BIC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroBicResult {
    pub category: RentalCategory,
    pub revenue: Decimal,
    pub allowance_rate: Decimal,
    pub allowance: Decimal,
    pub taxable_income: Decimal,
}

#[derive(Debug, Clone)]
pub struct MicroBicCalculator<'a> {
    allowances: &'a [MicroBicAllowance],
}

impl<'a> MicroBicCalculator<'a> {
    pub fn new(allowances: &'a [MicroBicAllowance]) -> Self {
        Self { allowances }
    }

    /// Applies the category allowance to `revenue`.
    ///
    /// ```
    /// use rust_decimal_macros::dec;
    /// use jeanbrun_core::calculations::MicroBicCalculator;
    /// use jeanbrun_core::{RentalCategory, TaxYearRules};
    ///
    /// let rules = TaxYearRules::builtin(2026).unwrap();
    /// let result = MicroBicCalculator::new(&rules.micro_bic)
    ///     .calculate(dec!(12000), RentalCategory::LongueDuree)
    ///     .unwrap();
    ///
    /// assert_eq!(result.taxable_income, dec!(6000.00));
    /// ```
    ///
    /// # Errors
    ///
    /// - [`ValidationError::NegativeAmount`] or [`ValidationError::AmountTooLarge`] for out-of-range revenue
    /// - [`ValidationError::MissingAllowance`] if the category has no table entry
    /// - [`EligibilityError::MicroBicCeilingExceeded`] above the category ceiling
    pub fn calculate(
        &self,
        revenue: Decimal,
        category: RentalCategory,
    ) -> Result<MicroBicResult, SimulationError> {
        ensure_amount("revenue", revenue)?;
        let entry = self
            .allowances
            .iter()
            .find(|a| a.category == category)
            .ok_or(ValidationError::MissingAllowance(category))?;

        if revenue > entry.revenue_ceiling {
            return Err(EligibilityError::MicroBicCeilingExceeded {
                category,
                revenue,
                ceiling: entry.revenue_ceiling,
            }
            .into());
        }

        let allowance = round_half_up(revenue * entry.allowance_rate);
        let taxable_income = revenue - allowance;

        debug!(
            category = %category,
            revenue = %revenue,
            taxable_income = %taxable_income,
            "micro-bic evaluated"
        );

        Ok(MicroBicResult {
            category,
            revenue,
            allowance_rate: entry.allowance_rate,
            allowance,
            taxable_income,
        })
    }
}
