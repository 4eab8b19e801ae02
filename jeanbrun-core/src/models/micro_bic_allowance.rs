use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::RentalCategory;

/// Flat Micro-BIC allowance and revenue ceiling for a rental category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroBicAllowance {
    pub tax_year: i32,
    pub category: RentalCategory,
    pub allowance_rate: Decimal,
    pub revenue_ceiling: Decimal,
}
