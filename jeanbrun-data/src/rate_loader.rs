use std::collections::BTreeMap;
use std::io::Read;

use jeanbrun_core::{
    JeanbrunRateTier, NiveauLoyer, RepositoryError, RuleRepository, ZoneFiscale,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Errors that can occur when loading Jeanbrun reduction rates.
#[derive(Debug, Error)]
pub enum JeanbrunRateLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Unknown zone '{0}'")]
    InvalidZone(String),

    #[error("Unknown rent level '{0}'")]
    InvalidNiveauLoyer(String),

    #[error("Reduction rate must be between 0 and 1, got {0}")]
    RateOutOfRange(Decimal),

    #[error("Tax year {0} not found in database (have you run the seeds?)")]
    TaxYearNotFound(i32),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for JeanbrunRateLoaderError {
    fn from(err: csv::Error) -> Self {
        JeanbrunRateLoaderError::CsvParse(err.to_string())
    }
}

/// A single record from the Jeanbrun rates CSV file.
///
/// - `zone`: `A bis`, `A`, `B1`, `B2` or `C`
/// - `duree_detention`: minimum holding period of the tier, in years
/// - `niveau_loyer`: `intermediaire`, `social` or `tres-social`
/// - `reduction_rate`: the rate as a decimal (e.g., 0.18)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct JeanbrunRateRecord {
    pub tax_year: i32,
    pub zone: String,
    pub duree_detention: u32,
    pub niveau_loyer: String,
    pub reduction_rate: Decimal,
}

impl TryFrom<&JeanbrunRateRecord> for JeanbrunRateTier {
    type Error = JeanbrunRateLoaderError;

    fn try_from(record: &JeanbrunRateRecord) -> Result<Self, Self::Error> {
        let zone = ZoneFiscale::parse(&record.zone)
            .ok_or_else(|| JeanbrunRateLoaderError::InvalidZone(record.zone.clone()))?;
        let niveau_loyer = NiveauLoyer::parse(&record.niveau_loyer).ok_or_else(|| {
            JeanbrunRateLoaderError::InvalidNiveauLoyer(record.niveau_loyer.clone())
        })?;
        if record.reduction_rate < Decimal::ZERO || record.reduction_rate > Decimal::ONE {
            return Err(JeanbrunRateLoaderError::RateOutOfRange(record.reduction_rate));
        }
        Ok(JeanbrunRateTier {
            tax_year: record.tax_year,
            zone,
            duree_detention: record.duree_detention,
            niveau_loyer,
            reduction_rate: record.reduction_rate,
        })
    }
}

/// Loader for Jeanbrun rate tiers from CSV files.
pub struct JeanbrunRateLoader;

impl JeanbrunRateLoader {
    /// Parse rate records from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<JeanbrunRateRecord>, JeanbrunRateLoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: JeanbrunRateRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Load rate records into the database, replacing every tier of each
    /// tax year present in the records.
    ///
    /// All records are converted before anything is written, so a bad code
    /// leaves the database untouched.
    pub async fn load<R: RuleRepository + ?Sized>(
        repo: &R,
        records: &[JeanbrunRateRecord],
    ) -> Result<usize, JeanbrunRateLoaderError> {
        let mut groups: BTreeMap<i32, Vec<JeanbrunRateTier>> = BTreeMap::new();
        for record in records {
            let tier = JeanbrunRateTier::try_from(record)?;
            groups.entry(tier.tax_year).or_default().push(tier);
        }

        let mut inserted = 0;
        for (tax_year, tiers) in groups {
            repo.get_tax_year_config(tax_year)
                .await
                .map_err(|e| match e {
                    RepositoryError::NotFound => JeanbrunRateLoaderError::TaxYearNotFound(tax_year),
                    other => JeanbrunRateLoaderError::Repository(other),
                })?;

            repo.delete_jeanbrun_tiers(tax_year).await?;
            for tier in &tiers {
                repo.insert_jeanbrun_tier(tier).await?;
                inserted += 1;
            }
            info!(tax_year, count = tiers.len(), "jeanbrun rate tiers loaded");
        }

        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn record(
        zone: &str,
        niveau: &str,
        rate: Decimal,
    ) -> JeanbrunRateRecord {
        JeanbrunRateRecord {
            tax_year: 2026,
            zone: zone.to_string(),
            duree_detention: 9,
            niveau_loyer: niveau.to_string(),
            reduction_rate: rate,
        }
    }

    #[test]
    fn test_parse_csv_with_spaced_zone() {
        let csv = "tax_year,zone,duree_detention,niveau_loyer,reduction_rate\n\
                   2026,A bis,9,social,0.20\n\
                   2026,B2,6,intermediaire,0.10\n";

        let records = JeanbrunRateLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], record("A bis", "social", dec!(0.20)));
        assert_eq!(records[1].duree_detention, 6);
    }

    #[test]
    fn test_record_converts_to_tier() {
        let tier = JeanbrunRateTier::try_from(&record("B1", "tres-social", dec!(0.22))).unwrap();

        assert_eq!(tier.zone, ZoneFiscale::B1);
        assert_eq!(tier.niveau_loyer, NiveauLoyer::TresSocial);
        assert_eq!(tier.reduction_rate, dec!(0.22));
    }

    #[test]
    fn test_unknown_zone_is_rejected() {
        let result = JeanbrunRateTier::try_from(&record("D", "social", dec!(0.2)));

        assert!(matches!(
            result,
            Err(JeanbrunRateLoaderError::InvalidZone(zone)) if zone == "D"
        ));
    }

    #[test]
    fn test_unknown_rent_level_is_rejected() {
        let result = JeanbrunRateTier::try_from(&record("A", "libre", dec!(0.2)));

        assert!(matches!(
            result,
            Err(JeanbrunRateLoaderError::InvalidNiveauLoyer(niveau)) if niveau == "libre"
        ));
    }

    #[test]
    fn test_rate_above_one_is_rejected() {
        let result = JeanbrunRateTier::try_from(&record("A", "social", dec!(18)));

        assert!(matches!(result, Err(JeanbrunRateLoaderError::RateOutOfRange(_))));
    }

    #[test]
    fn test_parse_rejects_negative_duration() {
        let csv = "tax_year,zone,duree_detention,niveau_loyer,reduction_rate\n\
                   2026,A,-6,social,0.14\n";

        let result = JeanbrunRateLoader::parse(csv.as_bytes());

        assert!(matches!(result, Err(JeanbrunRateLoaderError::CsvParse(_))));
    }
}
