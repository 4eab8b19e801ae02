use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A stored simulation: the wizard input and its result, serialized by the
/// caller, plus the headline figures for listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub id: i64,
    pub tax_year: i32,
    pub label: Option<String>,
    pub input_json: String,
    pub result_json: String,
    pub economie_impot: Decimal,
    pub comparatif_delta: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// For storing a new simulation (no id or timestamp)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSimulationRecord {
    pub tax_year: i32,
    pub label: Option<String>,
    pub input_json: String,
    pub result_json: String,
    pub economie_impot: Decimal,
    pub comparatif_delta: Option<Decimal>,
}
