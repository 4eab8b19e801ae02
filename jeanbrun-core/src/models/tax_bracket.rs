use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One marginal income-tax bracket, applied to the income per part.
///
/// `max_income` is `None` for the open top bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub tax_year: i32,
    pub min_income: Decimal,
    pub max_income: Option<Decimal>,
    pub tax_rate: Decimal,
}
