//! Progressive income tax with household parts ("quotient familial").
//!
//! The household's net taxable income is divided by its number of parts, the
//! marginal brackets are applied to that quotient, and the tax per part is
//! multiplied back by the number of parts.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use jeanbrun_core::calculations::IncomeTaxCalculator;
//! use jeanbrun_core::TaxYearRules;
//!
//! let rules = TaxYearRules::builtin(2026).unwrap();
//! let calculator = IncomeTaxCalculator::new(&rules.brackets);
//!
//! let result = calculator.calculate(dec!(60000), dec!(2.5)).unwrap();
//!
//! assert_eq!(result.quotient_income, dec!(24000));
//! assert_eq!(result.total_tax, dec!(3410.00));
//! assert_eq!(result.marginal_rate, dec!(0.11));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::TaxBracket;
use crate::calculations::common::{max, ratio_or_zero, round_half_up};
use crate::error::{ValidationError, ensure_amount, ensure_rate};

/// Result of an income-tax evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeTaxResult {
    /// Net taxable income of the household.
    pub taxable_income: Decimal,

    /// Number of parts the income was split into.
    pub parts: Decimal,

    /// Income per part, the figure the brackets apply to.
    pub quotient_income: Decimal,

    /// Household tax, rounded to the cent.
    pub total_tax: Decimal,

    /// Rate of the bracket holding the quotient income (TMI).
    pub marginal_rate: Decimal,

    /// Total tax divided by taxable income, zero for a zero income.
    pub average_rate: Decimal,
}

/// Evaluates a bracket schedule.
#[derive(Debug, Clone)]
pub struct IncomeTaxCalculator<'a> {
    brackets: &'a [TaxBracket],
}

impl<'a> IncomeTaxCalculator<'a> {
    /// Creates a calculator over `brackets`.
    ///
    /// Brackets must be sorted by `min_income`, start at zero, be contiguous,
    /// and end with an open bracket (`max_income` = `None`).
    pub fn new(brackets: &'a [TaxBracket]) -> Self {
        Self { brackets }
    }

    /// Computes the household tax for `taxable_income` split over `parts`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if:
    /// - the bracket schedule is malformed
    /// - `taxable_income` is negative
    /// - `parts` is not positive or not a multiple of a quarter part
    pub fn calculate(
        &self,
        taxable_income: Decimal,
        parts: Decimal,
    ) -> Result<IncomeTaxResult, ValidationError> {
        validate_brackets(self.brackets)?;
        ensure_amount("taxable_income", taxable_income)?;
        validate_parts(parts)?;

        let quotient_income = taxable_income / parts;
        let tax_per_part = self.tax_on_quotient(quotient_income);
        let total_tax = round_half_up(tax_per_part * parts);
        let marginal_rate = self.marginal_rate(quotient_income);
        let average_rate = ratio_or_zero(total_tax, taxable_income).round_dp(4);

        debug!(
            taxable_income = %taxable_income,
            parts = %parts,
            total_tax = %total_tax,
            marginal_rate = %marginal_rate,
            "income tax evaluated"
        );

        Ok(IncomeTaxResult {
            taxable_income,
            parts,
            quotient_income,
            total_tax,
            marginal_rate,
            average_rate,
        })
    }

    /// Tax attributable to `extra` income on top of `base`.
    ///
    /// Negative extra income is treated as zero: a rental deficit never
    /// lowers the household's other tax here.
    pub fn additional_tax(
        &self,
        base: Decimal,
        extra: Decimal,
        parts: Decimal,
    ) -> Result<Decimal, ValidationError> {
        let extra = max(extra, Decimal::ZERO);
        let without = self.calculate(base, parts)?.total_tax;
        let with = self.calculate(base + extra, parts)?.total_tax;
        Ok(with - without)
    }

    /// Sum of each bracket's rate applied to the slice of `quotient` inside it.
    fn tax_on_quotient(
        &self,
        quotient: Decimal,
    ) -> Decimal {
        let mut tax = Decimal::ZERO;
        for bracket in self.brackets {
            if quotient <= bracket.min_income {
                break;
            }
            let upper = bracket
                .max_income
                .map_or(quotient, |max_income| max_income.min(quotient));
            tax += (upper - bracket.min_income) * bracket.tax_rate;
        }
        tax
    }

    /// Rate of the first bracket whose upper bound is at or above `quotient`.
    fn marginal_rate(
        &self,
        quotient: Decimal,
    ) -> Decimal {
        self.brackets
            .iter()
            .find(|b| b.max_income.is_none_or(|max_income| quotient <= max_income))
            .map_or(Decimal::ZERO, |b| b.tax_rate)
    }
}

/// Checks that a bracket schedule covers `[0, ∞)` without gaps.
///
/// # Errors
///
/// Returns [`ValidationError`] describing the first defect found.
pub fn validate_brackets(brackets: &[TaxBracket]) -> Result<(), ValidationError> {
    let (first, last) = match (brackets.first(), brackets.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(ValidationError::NoTaxBrackets),
    };
    if !first.min_income.is_zero() {
        return Err(ValidationError::BracketsMustStartAtZero(first.min_income));
    }
    for bracket in brackets {
        ensure_rate("tax_rate", bracket.tax_rate)?;
        if bracket.max_income.is_some_and(|m| m <= bracket.min_income) {
            return Err(ValidationError::BracketGap(bracket.min_income));
        }
    }
    for pair in brackets.windows(2) {
        if pair[0].max_income != Some(pair[1].min_income) {
            return Err(ValidationError::BracketGap(pair[1].min_income));
        }
    }
    if last.max_income.is_some() {
        return Err(ValidationError::LastBracketNotOpen);
    }
    Ok(())
}

/// Checks that `parts` is positive and a multiple of 0.25.
pub fn validate_parts(parts: Decimal) -> Result<(), ValidationError> {
    if parts <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveParts(parts));
    }
    if !(parts * Decimal::from(4)).fract().is_zero() {
        return Err(ValidationError::FractionalParts(parts));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn bracket(
        min: Decimal,
        max: Option<Decimal>,
        rate: Decimal,
    ) -> TaxBracket {
        TaxBracket {
            tax_year: 2026,
            min_income: min,
            max_income: max,
            tax_rate: rate,
        }
    }

    fn test_brackets() -> Vec<TaxBracket> {
        vec![
            bracket(dec!(0), Some(dec!(11600)), dec!(0)),
            bracket(dec!(11600), Some(dec!(29579)), dec!(0.11)),
            bracket(dec!(29579), Some(dec!(84577)), dec!(0.30)),
            bracket(dec!(84577), Some(dec!(181917)), dec!(0.41)),
            bracket(dec!(181917), None, dec!(0.45)),
        ]
    }

    // =========================================================================
    // calculate tests
    // =========================================================================

    #[test]
    fn calculate_zero_income_uses_lowest_rate() {
        let brackets = test_brackets();
        let calculator = IncomeTaxCalculator::new(&brackets);

        let result = calculator.calculate(dec!(0), dec!(1)).unwrap();

        assert_eq!(result.total_tax, dec!(0));
        assert_eq!(result.marginal_rate, dec!(0));
        assert_eq!(result.average_rate, dec!(0));
    }

    #[test]
    fn calculate_single_part_spanning_three_brackets() {
        let brackets = test_brackets();
        let calculator = IncomeTaxCalculator::new(&brackets);

        let result = calculator.calculate(dec!(50000), dec!(1)).unwrap();

        // 17979 × 11% + 20421 × 30% = 1977.69 + 6126.30
        assert_eq!(result.total_tax, dec!(8103.99));
        assert_eq!(result.marginal_rate, dec!(0.30));
    }

    #[test]
    fn calculate_splits_income_over_parts() {
        let brackets = test_brackets();
        let calculator = IncomeTaxCalculator::new(&brackets);

        let result = calculator.calculate(dec!(60000), dec!(2.5)).unwrap();

        assert_eq!(result.quotient_income, dec!(24000));
        assert_eq!(result.total_tax, dec!(3410.00));
        assert_eq!(result.marginal_rate, dec!(0.11));
    }

    #[test]
    fn calculate_quotient_on_upper_bound_stays_in_lower_bracket() {
        let brackets = test_brackets();
        let calculator = IncomeTaxCalculator::new(&brackets);

        let result = calculator.calculate(dec!(11600), dec!(1)).unwrap();

        assert_eq!(result.total_tax, dec!(0));
        assert_eq!(result.marginal_rate, dec!(0));
    }

    #[test]
    fn calculate_top_bracket() {
        let brackets = test_brackets();
        let calculator = IncomeTaxCalculator::new(&brackets);

        let result = calculator.calculate(dec!(200000), dec!(1)).unwrap();

        assert_eq!(result.marginal_rate, dec!(0.45));
        assert!(result.total_tax > dec!(60000));
    }

    #[test]
    fn calculate_tax_is_monotonic_and_non_negative() {
        let brackets = test_brackets();
        let calculator = IncomeTaxCalculator::new(&brackets);

        for parts in [dec!(1), dec!(1.5), dec!(2), dec!(3.25)] {
            let mut previous = Decimal::ZERO;
            for step in 0..=160 {
                let income = Decimal::from(step * 2_500);
                let tax = calculator.calculate(income, parts).unwrap().total_tax;

                assert!(tax >= Decimal::ZERO);
                assert!(tax >= previous, "tax decreased at {income} for {parts} parts");
                previous = tax;
            }
        }
    }

    #[test]
    fn calculate_is_idempotent() {
        let brackets = test_brackets();
        let calculator = IncomeTaxCalculator::new(&brackets);

        let a = calculator.calculate(dec!(73456.78), dec!(2)).unwrap();
        let b = calculator.calculate(dec!(73456.78), dec!(2)).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn calculate_rejects_zero_parts() {
        let brackets = test_brackets();
        let calculator = IncomeTaxCalculator::new(&brackets);

        let result = calculator.calculate(dec!(50000), dec!(0));

        assert_eq!(result, Err(ValidationError::NonPositiveParts(dec!(0))));
    }

    #[test]
    fn calculate_rejects_negative_parts() {
        let brackets = test_brackets();
        let calculator = IncomeTaxCalculator::new(&brackets);

        let result = calculator.calculate(dec!(50000), dec!(-1));

        assert_eq!(result, Err(ValidationError::NonPositiveParts(dec!(-1))));
    }

    #[test]
    fn calculate_rejects_non_quarter_parts() {
        let brackets = test_brackets();
        let calculator = IncomeTaxCalculator::new(&brackets);

        let result = calculator.calculate(dec!(50000), dec!(1.3));

        assert_eq!(result, Err(ValidationError::FractionalParts(dec!(1.3))));
    }

    #[test]
    fn calculate_rejects_negative_income() {
        let brackets = test_brackets();
        let calculator = IncomeTaxCalculator::new(&brackets);

        let result = calculator.calculate(dec!(-10), dec!(1));

        assert!(matches!(
            result,
            Err(ValidationError::NegativeAmount {
                field: "taxable_income",
                ..
            })
        ));
    }

    // =========================================================================
    // additional_tax tests
    // =========================================================================

    #[test]
    fn additional_tax_attributes_marginal_slice() {
        let brackets = test_brackets();
        let calculator = IncomeTaxCalculator::new(&brackets);

        let extra = calculator
            .additional_tax(dec!(50000), dec!(6000), dec!(1))
            .unwrap();

        assert_eq!(extra, dec!(1800.00));
    }

    #[test]
    fn additional_tax_ignores_negative_extra() {
        let brackets = test_brackets();
        let calculator = IncomeTaxCalculator::new(&brackets);

        let extra = calculator
            .additional_tax(dec!(50000), dec!(-6000), dec!(1))
            .unwrap();

        assert_eq!(extra, dec!(0));
    }

    // =========================================================================
    // validate_brackets tests
    // =========================================================================

    #[test]
    fn validate_brackets_rejects_empty() {
        assert_eq!(validate_brackets(&[]), Err(ValidationError::NoTaxBrackets));
    }

    #[test]
    fn validate_brackets_rejects_non_zero_start() {
        let brackets = vec![bracket(dec!(100), None, dec!(0.1))];

        assert_eq!(
            validate_brackets(&brackets),
            Err(ValidationError::BracketsMustStartAtZero(dec!(100)))
        );
    }

    #[test]
    fn validate_brackets_rejects_gap() {
        let brackets = vec![
            bracket(dec!(0), Some(dec!(1000)), dec!(0)),
            bracket(dec!(1200), None, dec!(0.1)),
        ];

        assert_eq!(
            validate_brackets(&brackets),
            Err(ValidationError::BracketGap(dec!(1200)))
        );
    }

    #[test]
    fn validate_brackets_rejects_closed_top() {
        let brackets = vec![bracket(dec!(0), Some(dec!(1000)), dec!(0))];

        assert_eq!(
            validate_brackets(&brackets),
            Err(ValidationError::LastBracketNotOpen)
        );
    }

    #[test]
    fn validate_brackets_rejects_rate_above_one() {
        let brackets = vec![bracket(dec!(0), None, dec!(1.5))];

        assert!(matches!(
            validate_brackets(&brackets),
            Err(ValidationError::RateOutOfRange { .. })
        ));
    }

    #[test]
    fn validate_parts_accepts_quarters() {
        assert_eq!(validate_parts(dec!(1.25)), Ok(()));
        assert_eq!(validate_parts(dec!(2.5)), Ok(()));
    }
}
