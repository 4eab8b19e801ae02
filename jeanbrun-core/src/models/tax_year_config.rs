use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Scalar parameters of a tax year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxYearConfig {
    pub tax_year: i32,
    /// Minimum share of renovation works in the total operation cost.
    pub travaux_min_share: Decimal,
    /// Cap on the base the Jeanbrun reduction rate applies to.
    pub investment_ceiling: Decimal,
    /// Annual cap on the tax reductions a household may use.
    pub tax_niche_ceiling: Decimal,
    /// Social contributions levied on rental income.
    pub social_contributions_rate: Decimal,
    /// Debt-ratio ceiling applied by lenders.
    pub max_debt_ratio: Decimal,
    /// Annual depreciation rate of renovation works under LMNP Reel.
    pub travaux_depreciation_rate: Decimal,
    /// Annual depreciation rate of furniture under LMNP Reel.
    pub mobilier_depreciation_rate: Decimal,
}
