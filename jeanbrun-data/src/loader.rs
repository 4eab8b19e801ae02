use std::collections::BTreeMap;
use std::io::Read;

use jeanbrun_core::calculations::income_tax::validate_brackets;
use jeanbrun_core::{RepositoryError, RuleRepository, TaxBracket, ValidationError};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::fields::deserialize_optional_decimal;

/// Errors that can occur when loading income tax brackets.
#[derive(Debug, Error)]
pub enum TaxBracketLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Invalid bracket schedule for {tax_year}: {source}")]
    InvalidSchedule {
        tax_year: i32,
        source: ValidationError,
    },

    #[error("Tax year {0} not found in database (have you run the seeds?)")]
    TaxYearNotFound(i32),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for TaxBracketLoaderError {
    fn from(err: csv::Error) -> Self {
        TaxBracketLoaderError::CsvParse(err.to_string())
    }
}

/// A single record from the tax brackets CSV file.
///
/// - `tax_year`: the tax year the schedule applies to (e.g., 2026)
/// - `min_income`: lower bound of the bracket, per part
/// - `max_income`: upper bound of the bracket (empty for the top bracket)
/// - `rate`: the marginal rate as a decimal (e.g., 0.11 for 11%)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaxBracketRecord {
    pub tax_year: i32,
    pub min_income: Decimal,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub max_income: Option<Decimal>,
    pub rate: Decimal,
}

impl From<&TaxBracketRecord> for TaxBracket {
    fn from(record: &TaxBracketRecord) -> Self {
        TaxBracket {
            tax_year: record.tax_year,
            min_income: record.min_income,
            max_income: record.max_income,
            tax_rate: record.rate,
        }
    }
}

/// Loader for income tax brackets from CSV files.
///
/// Works with any [`RuleRepository`] backend.
pub struct TaxBracketLoader;

impl TaxBracketLoader {
    /// Parse bracket records from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<TaxBracketRecord>, TaxBracketLoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: TaxBracketRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Load bracket records into the database.
    ///
    /// For each tax year in the records, this method will:
    /// 1. Check the schedule covers `[0, ∞)` without gaps
    /// 2. Check the tax year exists
    /// 3. Delete any existing brackets for that year
    /// 4. Insert the new brackets
    ///
    /// Loading is idempotent. Returns the number of brackets inserted.
    pub async fn load<R: RuleRepository + ?Sized>(
        repo: &R,
        records: &[TaxBracketRecord],
    ) -> Result<usize, TaxBracketLoaderError> {
        let mut groups: BTreeMap<i32, Vec<TaxBracket>> = BTreeMap::new();
        for record in records {
            groups
                .entry(record.tax_year)
                .or_default()
                .push(TaxBracket::from(record));
        }

        let mut inserted = 0;
        for (tax_year, mut brackets) in groups {
            brackets.sort_by(|a, b| a.min_income.cmp(&b.min_income));
            validate_brackets(&brackets)
                .map_err(|source| TaxBracketLoaderError::InvalidSchedule { tax_year, source })?;

            repo.get_tax_year_config(tax_year)
                .await
                .map_err(|e| match e {
                    RepositoryError::NotFound => TaxBracketLoaderError::TaxYearNotFound(tax_year),
                    other => TaxBracketLoaderError::Repository(other),
                })?;

            repo.delete_tax_brackets(tax_year).await?;
            for bracket in &brackets {
                repo.insert_tax_bracket(bracket).await?;
                inserted += 1;
            }
            info!(tax_year, count = brackets.len(), "tax brackets loaded");
        }

        Ok(inserted)
    }
}
