use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{NiveauLoyer, ZoneFiscale};

/// Reduction rate granted for holding at least `duree_detention` years in a
/// zone at a rent level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JeanbrunRateTier {
    pub tax_year: i32,
    pub zone: ZoneFiscale,
    pub duree_detention: u32,
    pub niveau_loyer: NiveauLoyer,
    pub reduction_rate: Decimal,
}

/// Monthly rent ceiling per square metre for a zone and rent level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentCeiling {
    pub tax_year: i32,
    pub zone: ZoneFiscale,
    pub niveau_loyer: NiveauLoyer,
    pub plafond_m2: Decimal,
}
