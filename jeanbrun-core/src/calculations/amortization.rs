//! Component-based depreciation for the LMNP réel regime.
//!
//! A property is split into components (land, structure, façades, fittings),
//! each carrying a share of the price and a straight-line depreciation rate.
//! Land never depreciates. Each component's cumulative depreciation is capped
//! at its own base.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use jeanbrun_core::calculations::AmortizationSchedule;
//! use jeanbrun_core::TaxYearRules;
//!
//! let rules = TaxYearRules::builtin(2026).unwrap();
//! let schedule = AmortizationSchedule::new(&rules.components)
//!     .schedule(dec!(200000), 12)
//!     .unwrap();
//!
//! assert_eq!(schedule.len(), 12);
//! assert_eq!(schedule[0].total_depreciation, dec!(7200.00));
//! // Fittings are fully written off after ten years.
//! assert_eq!(schedule[10].total_depreciation, dec!(3200.00));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::PropertyComponent;
use crate::calculations::MAX_HOLDING_YEARS;
use crate::calculations::common::round_half_up;
use crate::error::{ValidationError, ensure_amount, ensure_rate};

/// Depreciation of one component for one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDepreciation {
    pub name: String,
    pub depreciation: Decimal,
    pub cumulative: Decimal,
}

/// One year of the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationRow {
    /// 1-based year index.
    pub year: u32,
    pub total_depreciation: Decimal,
    pub cumulative_depreciation: Decimal,
    /// Price minus cumulative depreciation, land included.
    pub remaining_book_value: Decimal,
    /// Same order as the component set.
    pub by_component: Vec<ComponentDepreciation>,
}

/// Builds yearly depreciation schedules over a component set.
#[derive(Debug, Clone)]
pub struct AmortizationSchedule<'a> {
    components: &'a [PropertyComponent],
}

impl<'a> AmortizationSchedule<'a> {
    pub fn new(components: &'a [PropertyComponent]) -> Self {
        Self { components }
    }

    /// Depreciation rows for years `1..=duration_years`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if:
    /// - `price` is negative
    /// - the component set is invalid (see [`validate_components`])
    /// - `duration_years` exceeds 30
    pub fn schedule(
        &self,
        price: Decimal,
        duration_years: u32,
    ) -> Result<Vec<AmortizationRow>, ValidationError> {
        ensure_amount("price", price)?;
        validate_components(self.components)?;
        if duration_years > MAX_HOLDING_YEARS {
            return Err(ValidationError::DurationTooLong {
                field: "duration_years",
                value: duration_years,
                max: MAX_HOLDING_YEARS,
            });
        }

        let per_component: Vec<Vec<Decimal>> = self
            .components
            .iter()
            .map(|c| straight_line(price * c.allocation_share, c.depreciation_rate, duration_years))
            .collect();

        let mut rows = Vec::with_capacity(duration_years as usize);
        let mut cumulative_total = Decimal::ZERO;
        let mut cumulative_by_component = vec![Decimal::ZERO; self.components.len()];

        for index in 0..duration_years as usize {
            let mut by_component = Vec::with_capacity(self.components.len());
            let mut total = Decimal::ZERO;

            for (c, component) in self.components.iter().enumerate() {
                let amount = per_component[c][index];
                cumulative_by_component[c] += amount;
                total += amount;
                by_component.push(ComponentDepreciation {
                    name: component.name.clone(),
                    depreciation: amount,
                    cumulative: cumulative_by_component[c],
                });
            }

            cumulative_total += total;
            rows.push(AmortizationRow {
                year: index as u32 + 1,
                total_depreciation: total,
                cumulative_depreciation: cumulative_total,
                remaining_book_value: price - cumulative_total,
                by_component,
            });
        }

        debug!(
            price = %price,
            years = duration_years,
            cumulative = %cumulative_total,
            "depreciation schedule built"
        );

        Ok(rows)
    }
}

/// Yearly straight-line depreciation of a single asset.
///
/// Each annuity is rounded to the cent, and the last ones shrink so the total
/// never exceeds `base`.
pub fn straight_line(
    base: Decimal,
    rate: Decimal,
    duration_years: u32,
) -> Vec<Decimal> {
    let annuity = round_half_up(base * rate);
    let mut remaining = base;
    (0..duration_years)
        .map(|_| {
            let amount = annuity.min(remaining).max(Decimal::ZERO);
            remaining -= amount;
            amount
        })
        .collect()
}

/// Checks shares and rates of a component set.
///
/// Shares and rates must lie in `[0, 1]` and shares must sum to exactly 1.
pub fn validate_components(components: &[PropertyComponent]) -> Result<(), ValidationError> {
    let mut total_share = Decimal::ZERO;
    for component in components {
        ensure_rate("allocation_share", component.allocation_share)?;
        ensure_rate("depreciation_rate", component.depreciation_rate)?;
        total_share += component.allocation_share;
    }
    if total_share != Decimal::ONE {
        return Err(ValidationError::InvalidComponentShares(total_share));
    }
    Ok(())
}
