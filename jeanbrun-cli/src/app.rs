use std::path::Path;

use anyhow::{Context, Result, bail};
use jeanbrun_core::calculations::{SimulationOptions, SimulationResult, orchestrer_simulation};
use jeanbrun_core::db::{DbConfig, RepositoryRegistry};
use jeanbrun_core::{
    NewSimulationRecord, RepositoryError, RuleRepository, SimulationInput, SimulationRecord,
    TaxYearRules,
};
use jeanbrun_db_sqlite::SqliteRepositoryFactory;
use tracing::{debug, info, warn};

use crate::csv_loader::Scenario;

/// Registry with every backend compiled into the binary.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

/// Open the configured repository, if any.
pub async fn open_repository(
    db_config: Option<&DbConfig>
) -> Result<Option<Box<dyn RuleRepository>>> {
    let Some(db_config) = db_config else {
        return Ok(None);
    };
    debug!(backend = %db_config.backend, "opening repository");
    let repo = build_registry()
        .create(db_config)
        .await
        .with_context(|| format!("cannot open {} database", db_config.backend))?;
    Ok(Some(repo))
}

/// Rule tables for `year`, from the repository when one is open, else built in.
pub async fn resolve_rules(
    repo: Option<&dyn RuleRepository>,
    year: i32,
) -> Result<TaxYearRules> {
    match repo {
        Some(repo) => match repo.load_rules(year).await {
            Ok(rules) => {
                info!(year, "rules loaded from database");
                Ok(rules)
            }
            Err(RepositoryError::NotFound) => {
                let known = describe_known_years(repo.list_tax_years().await);
                bail!("no rules for {year} in the database; available: {known}")
            }
            Err(err) => Err(err).with_context(|| format!("cannot load rules for {year}")),
        },
        None => match TaxYearRules::builtin(year) {
            Some(rules) => Ok(rules.clone()),
            None => bail!(
                "no built-in rules for {year}; available: {:?}",
                TaxYearRules::builtin_years()
            ),
        },
    }
}

fn describe_known_years(years: Result<Vec<i32>, RepositoryError>) -> String {
    match years {
        Ok(years) => format!("{years:?}"),
        Err(err) => {
            warn!(error = %err, "cannot list tax years");
            "unknown".to_string()
        }
    }
}

/// Tax year used when the command line does not name one.
pub fn default_tax_year(configured: Option<i32>) -> i32 {
    configured.unwrap_or_else(|| TaxYearRules::latest_builtin().tax_year())
}

pub fn read_input(path: &Path) -> Result<SimulationInput> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read '{}'", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("'{}' is not a valid wizard input", path.display()))
}

pub fn simulate(
    input: &SimulationInput,
    rules: &TaxYearRules,
    options: SimulationOptions,
) -> Result<SimulationResult> {
    orchestrer_simulation(input, rules, options).context("simulation rejected")
}

/// Store a finished simulation with its input, as JSON.
pub async fn save_simulation(
    repo: &dyn RuleRepository,
    label: Option<String>,
    input: &SimulationInput,
    result: &SimulationResult,
) -> Result<SimulationRecord> {
    let record = NewSimulationRecord {
        tax_year: result.tax_year,
        label,
        input_json: serde_json::to_string(input).context("cannot serialize input")?,
        result_json: serde_json::to_string(result).context("cannot serialize result")?,
        economie_impot: result.economie_impot,
        comparatif_delta: result.comparatif.delta,
    };
    repo.create_simulation(record)
        .await
        .context("cannot save simulation")
}

/// Outcome of one batch line. A rejected line does not stop the batch.
#[derive(Debug)]
pub struct BatchLine {
    pub label: String,
    pub outcome: Result<SimulationResult, String>,
}

pub fn run_batch(
    scenarios: &[Scenario],
    rules: &TaxYearRules,
    options: SimulationOptions,
) -> Vec<BatchLine> {
    scenarios
        .iter()
        .map(|scenario| {
            let outcome = orchestrer_simulation(&scenario.input, rules, options).map_err(|err| {
                warn!(label = %scenario.label, %err, "scenario rejected");
                err.to_string()
            });
            BatchLine {
                label: scenario.label.clone(),
                outcome,
            }
        })
        .collect()
}
