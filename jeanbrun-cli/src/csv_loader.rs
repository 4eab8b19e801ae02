//! CSV loader for batch simulations.
//!
//! One row per scenario, wizard fields flattened. Headers are matched by
//! name, so column order does not matter. Optional cells may be left empty.
//!
//! | Column | Required | Notes |
//! |--------------------------|----------|--------------------------------------------------|
//! | `label` | no | Shown in the batch report; defaults to `row N` |
//! | `taxable_income` | yes | |
//! | `situation` | no | `celibataire` (default) or `couple` |
//! | `children` | no | |
//! | `parts` | no | Derived from situation and children when empty |
//! | `monthly_income` | no | |
//! | `existing_monthly_debt` | no | |
//! | `purchase_price` | yes | |
//! | `travaux_amount` | no | |
//! | `furniture_amount` | no | |
//! | `zone_fiscale` | yes | `A bis`, `A`, `B1`, `B2`, `C` |
//! | `surface_m2` | no | |
//! | `down_payment` | no | |
//! | `annual_rate` | yes | Fraction, e.g. `0.036` |
//! | `duration_years` | yes | |
//! | `differe_months` | no | |
//! | `insurance_rate` | no | |
//! | `monthly_rent` | yes | |
//! | `annual_charges` | no | |
//! | `rental_category` | no | `longue-duree` (default), `tourisme-non-classe`, `chambres-hotes` |
//! | `lmnp_regime` | no | `micro-bic` or `reel` |
//! | `niveau_loyer` | no | `intermediaire` (default), `social`, `tres-social` |
//! | `duree_detention` | yes | |
//! | `revalorisation_rate` | no | |
//! | `structure` | no | `nom-propre` (default), `sci-ir`, `sci-is` |
//!
//! ### Minimal example
//!
//! ```csv
//! taxable_income,purchase_price,zone_fiscale,annual_rate,duration_years,monthly_rent,duree_detention
//! 45000,180000,B1,0.035,20,750,9
//! ```
use std::path::Path;

use anyhow::Context;
use jeanbrun_core::{
    FamilySituation, FinancingStep, HoldingStep, LegalStructure, LegalStructureStep, LmnpRegime,
    NiveauLoyer, ProfileStep, PropertyStep, RentalCategory, RentalStrategyStep, SimulationInput,
    ZoneFiscale,
};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CsvRow {
    label: Option<String>,
    taxable_income: Decimal,
    situation: Option<String>,
    children: Option<u32>,
    parts: Option<Decimal>,
    monthly_income: Option<Decimal>,
    existing_monthly_debt: Option<Decimal>,
    purchase_price: Decimal,
    travaux_amount: Option<Decimal>,
    furniture_amount: Option<Decimal>,
    zone_fiscale: String,
    surface_m2: Option<Decimal>,
    down_payment: Option<Decimal>,
    annual_rate: Decimal,
    duration_years: u32,
    differe_months: Option<u32>,
    insurance_rate: Option<Decimal>,
    monthly_rent: Decimal,
    annual_charges: Option<Decimal>,
    rental_category: Option<String>,
    lmnp_regime: Option<String>,
    niveau_loyer: Option<String>,
    duree_detention: u32,
    revalorisation_rate: Option<Decimal>,
    structure: Option<String>,
}

/// Errors that can occur while loading a scenario file.
#[derive(Debug, thiserror::Error)]
pub enum CsvLoadError {
    /// Bad structure, missing required column, type mismatch.
    #[error("CSV parse error: {0}")]
    Parse(#[from] csv::Error),

    /// A code column holds a value outside its list. `row` is 1-based,
    /// header excluded.
    #[error("unrecognised {field} '{value}' on row {row}")]
    InvalidCode {
        field: &'static str,
        value: String,
        row: usize,
    },
}

/// One batch line: a label and the wizard input it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub label: String,
    pub input: SimulationInput,
}

fn code<T>(
    field: &'static str,
    value: Option<String>,
    row: usize,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, CsvLoadError> {
    match value {
        None => Ok(None),
        Some(value) => parse(&value)
            .map(Some)
            .ok_or(CsvLoadError::InvalidCode { field, value, row }),
    }
}

fn convert_row(
    row: CsvRow,
    row_number: usize,
) -> Result<Scenario, CsvLoadError> {
    let zone_fiscale =
        ZoneFiscale::parse(&row.zone_fiscale).ok_or_else(|| CsvLoadError::InvalidCode {
            field: "zone_fiscale",
            value: row.zone_fiscale.clone(),
            row: row_number,
        })?;
    let situation = code("situation", row.situation, row_number, FamilySituation::parse)?;
    let rental_category =
        code("rental_category", row.rental_category, row_number, RentalCategory::parse)?;
    let lmnp_regime = code("lmnp_regime", row.lmnp_regime, row_number, LmnpRegime::parse)?;
    let niveau_loyer = code("niveau_loyer", row.niveau_loyer, row_number, NiveauLoyer::parse)?;
    let structure = code("structure", row.structure, row_number, LegalStructure::parse)?;

    let zero = Decimal::ZERO;
    let input = SimulationInput {
        profile: ProfileStep {
            taxable_income: row.taxable_income,
            situation: situation.unwrap_or_default(),
            children: row.children.unwrap_or(0),
            parts: row.parts,
            monthly_income: row.monthly_income.unwrap_or(zero),
            existing_monthly_debt: row.existing_monthly_debt.unwrap_or(zero),
        },
        property: PropertyStep {
            purchase_price: row.purchase_price,
            travaux_amount: row.travaux_amount.unwrap_or(zero),
            furniture_amount: row.furniture_amount.unwrap_or(zero),
            zone_fiscale,
            surface_m2: row.surface_m2.unwrap_or(zero),
        },
        financing: FinancingStep {
            down_payment: row.down_payment.unwrap_or(zero),
            annual_rate: row.annual_rate,
            duration_years: row.duration_years,
            differe_months: row.differe_months.unwrap_or(0),
            insurance_rate: row.insurance_rate.unwrap_or(zero),
        },
        rental: RentalStrategyStep {
            monthly_rent: row.monthly_rent,
            annual_charges: row.annual_charges.unwrap_or(zero),
            rental_category: rental_category.unwrap_or_default(),
            lmnp_regime,
            niveau_loyer: niveau_loyer.unwrap_or_default(),
        },
        holding: HoldingStep {
            duree_detention: row.duree_detention,
            revalorisation_rate: row.revalorisation_rate.unwrap_or(zero),
        },
        legal: LegalStructureStep {
            structure: structure.unwrap_or_default(),
        },
    };

    Ok(Scenario {
        label: row
            .label
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| format!("row {row_number}")),
        input,
    })
}

/// Parse CSV text into scenarios, in file order.
///
/// # Errors
///
/// * [`CsvLoadError::Parse`] if the CSV is structurally invalid or a required
///   field cannot be deserialised.
/// * [`CsvLoadError::InvalidCode`] if a code column holds an unknown value.
pub fn load_from_str(input: &str) -> Result<Vec<Scenario>, CsvLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(input.as_bytes());

    reader
        .deserialize::<CsvRow>()
        .enumerate()
        .map(|(idx, result)| convert_row(result?, idx + 1))
        .collect()
}

/// Read a file from disk and delegate to [`load_from_str`].
pub fn load_from_file(path: &Path) -> anyhow::Result<Vec<Scenario>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read '{}'", path.display()))?;
    let scenarios = load_from_str(&contents)
        .with_context(|| format!("invalid scenario file '{}'", path.display()))?;
    Ok(scenarios)
}
