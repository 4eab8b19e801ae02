use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A depreciable (or not, for land) part of a property.
///
/// `allocation_share` is the fraction of the purchase price attributed to the
/// component; `depreciation_rate` is the annual straight-line rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyComponent {
    pub name: String,
    pub allocation_share: Decimal,
    pub depreciation_rate: Decimal,
}

impl PropertyComponent {
    pub fn new(
        name: impl Into<String>,
        allocation_share: Decimal,
        depreciation_rate: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            allocation_share,
            depreciation_rate,
        }
    }
}
