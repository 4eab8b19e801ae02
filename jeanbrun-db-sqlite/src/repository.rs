use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use jeanbrun_core::{
    JeanbrunRateTier, MicroBicAllowance, NewSimulationRecord, NiveauLoyer, PropertyComponent,
    RentCeiling, RentalCategory, RepositoryError, RuleRepository, SimulationRecord, TaxBracket,
    TaxYearConfig, ZoneFiscale,
};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Decode, Row, Sqlite, Type};
use tracing::{debug, info};

use crate::decimal::{decimal_to_text, get_decimal, get_optional_decimal};

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Connect to `database_url` (e.g. `sqlite:jeanbrun.db?mode=rwc`).
    ///
    /// In-memory databases get a single connection so every query sees the
    /// same schema.
    pub async fn new(database_url: &str) -> Result<Self, RepositoryError> {
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| {
                RepositoryError::Connection(format!("Failed to connect to {database_url}: {e}"))
            })?;
        debug!(%database_url, "sqlite pool opened");
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to run migrations: {e}")))
    }

    /// Load and execute all SQL seed files from the specified directory.
    /// Files are executed in alphabetical order by filename.
    pub async fn run_seeds(&self, seeds_dir: &Path) -> anyhow::Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in &entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
        }

        info!(files = entries.len(), dir = %seeds_dir.display(), "seeds applied");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: Decode<'r, Sqlite> + Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| RepositoryError::Database(e.to_string()))
}

fn zone_column(row: &SqliteRow) -> Result<ZoneFiscale, RepositoryError> {
    let raw: String = column(row, "zone")?;
    ZoneFiscale::parse(&raw)
        .ok_or_else(|| RepositoryError::Database(format!("Invalid zone: {raw}")))
}

fn niveau_column(row: &SqliteRow) -> Result<NiveauLoyer, RepositoryError> {
    let raw: String = column(row, "niveau_loyer")?;
    NiveauLoyer::parse(&raw)
        .ok_or_else(|| RepositoryError::Database(format!("Invalid rent level: {raw}")))
}

fn row_to_simulation(row: &SqliteRow) -> Result<SimulationRecord, RepositoryError> {
    Ok(SimulationRecord {
        id: column(row, "id")?,
        tax_year: column(row, "tax_year")?,
        label: column(row, "label")?,
        input_json: column(row, "input_json")?,
        result_json: column(row, "result_json")?,
        economie_impot: get_decimal(row, "economie_impot")?,
        comparatif_delta: get_optional_decimal(row, "comparatif_delta")?,
        created_at: column(row, "created_at")?,
    })
}

const SIMULATION_COLUMNS: &str = "id, tax_year, label, input_json, result_json, \
     economie_impot, comparatif_delta, created_at";

#[async_trait]
impl RuleRepository for SqliteRepository {
    async fn get_tax_year_config(&self, year: i32) -> Result<TaxYearConfig, RepositoryError> {
        let row = sqlx::query(
            "SELECT tax_year, travaux_min_share, investment_ceiling, tax_niche_ceiling,
                    social_contributions_rate, max_debt_ratio, travaux_depreciation_rate,
                    mobilier_depreciation_rate
             FROM tax_year_config
             WHERE tax_year = ?",
        )
        .bind(year)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(TaxYearConfig {
            tax_year: column(&row, "tax_year")?,
            travaux_min_share: get_decimal(&row, "travaux_min_share")?,
            investment_ceiling: get_decimal(&row, "investment_ceiling")?,
            tax_niche_ceiling: get_decimal(&row, "tax_niche_ceiling")?,
            social_contributions_rate: get_decimal(&row, "social_contributions_rate")?,
            max_debt_ratio: get_decimal(&row, "max_debt_ratio")?,
            travaux_depreciation_rate: get_decimal(&row, "travaux_depreciation_rate")?,
            mobilier_depreciation_rate: get_decimal(&row, "mobilier_depreciation_rate")?,
        })
    }

    async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError> {
        let rows = sqlx::query("SELECT tax_year FROM tax_year_config ORDER BY tax_year")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(|row| column(row, "tax_year")).collect()
    }

    async fn get_tax_brackets(&self, tax_year: i32) -> Result<Vec<TaxBracket>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT tax_year, min_income, max_income, tax_rate
             FROM tax_bracket
             WHERE tax_year = ?
             ORDER BY CAST(min_income AS REAL)",
        )
        .bind(tax_year)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let mut brackets = Vec::with_capacity(rows.len());
        for row in &rows {
            brackets.push(TaxBracket {
                tax_year: column(row, "tax_year")?,
                min_income: get_decimal(row, "min_income")?,
                max_income: get_optional_decimal(row, "max_income")?,
                tax_rate: get_decimal(row, "tax_rate")?,
            });
        }
        Ok(brackets)
    }

    async fn insert_tax_bracket(&self, bracket: &TaxBracket) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO tax_bracket (tax_year, min_income, max_income, tax_rate)
             VALUES (?, ?, ?, ?)",
        )
        .bind(bracket.tax_year)
        .bind(decimal_to_text(bracket.min_income))
        .bind(bracket.max_income.map(decimal_to_text))
        .bind(decimal_to_text(bracket.tax_rate))
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_tax_brackets(&self, tax_year: i32) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM tax_bracket WHERE tax_year = ?")
            .bind(tax_year)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        debug!(tax_year, removed = result.rows_affected(), "tax brackets deleted");
        Ok(())
    }

    async fn get_micro_bic_allowances(
        &self,
        tax_year: i32,
    ) -> Result<Vec<MicroBicAllowance>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT tax_year, category, allowance_rate, revenue_ceiling
             FROM micro_bic_allowance
             WHERE tax_year = ?
             ORDER BY rowid",
        )
        .bind(tax_year)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let mut allowances = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw: String = column(row, "category")?;
            let category = RentalCategory::parse(&raw).ok_or_else(|| {
                RepositoryError::Database(format!("Invalid rental category: {raw}"))
            })?;
            allowances.push(MicroBicAllowance {
                tax_year: column(row, "tax_year")?,
                category,
                allowance_rate: get_decimal(row, "allowance_rate")?,
                revenue_ceiling: get_decimal(row, "revenue_ceiling")?,
            });
        }
        Ok(allowances)
    }

    async fn get_property_components(
        &self,
        tax_year: i32,
    ) -> Result<Vec<PropertyComponent>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT name, allocation_share, depreciation_rate
             FROM property_component
             WHERE tax_year = ?
             ORDER BY position",
        )
        .bind(tax_year)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let mut components = Vec::with_capacity(rows.len());
        for row in &rows {
            components.push(PropertyComponent {
                name: column(row, "name")?,
                allocation_share: get_decimal(row, "allocation_share")?,
                depreciation_rate: get_decimal(row, "depreciation_rate")?,
            });
        }
        Ok(components)
    }

    async fn get_jeanbrun_tiers(
        &self,
        tax_year: i32,
    ) -> Result<Vec<JeanbrunRateTier>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT tax_year, zone, duree_detention, niveau_loyer, reduction_rate
             FROM jeanbrun_rate_tier
             WHERE tax_year = ?
             ORDER BY rowid",
        )
        .bind(tax_year)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let mut tiers = Vec::with_capacity(rows.len());
        for row in &rows {
            let duree: i64 = column(row, "duree_detention")?;
            let duree_detention = u32::try_from(duree).map_err(|_| {
                RepositoryError::Database(format!("Invalid holding period: {duree}"))
            })?;
            tiers.push(JeanbrunRateTier {
                tax_year: column(row, "tax_year")?,
                zone: zone_column(row)?,
                duree_detention,
                niveau_loyer: niveau_column(row)?,
                reduction_rate: get_decimal(row, "reduction_rate")?,
            });
        }
        Ok(tiers)
    }

    async fn insert_jeanbrun_tier(&self, tier: &JeanbrunRateTier) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO jeanbrun_rate_tier
                 (tax_year, zone, duree_detention, niveau_loyer, reduction_rate)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(tier.tax_year)
        .bind(tier.zone.as_str())
        .bind(i64::from(tier.duree_detention))
        .bind(tier.niveau_loyer.as_str())
        .bind(decimal_to_text(tier.reduction_rate))
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_jeanbrun_tiers(&self, tax_year: i32) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM jeanbrun_rate_tier WHERE tax_year = ?")
            .bind(tax_year)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        debug!(tax_year, removed = result.rows_affected(), "jeanbrun tiers deleted");
        Ok(())
    }

    async fn get_rent_ceilings(&self, tax_year: i32) -> Result<Vec<RentCeiling>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT tax_year, zone, niveau_loyer, plafond_m2
             FROM rent_ceiling
             WHERE tax_year = ?
             ORDER BY rowid",
        )
        .bind(tax_year)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let mut ceilings = Vec::with_capacity(rows.len());
        for row in &rows {
            ceilings.push(RentCeiling {
                tax_year: column(row, "tax_year")?,
                zone: zone_column(row)?,
                niveau_loyer: niveau_column(row)?,
                plafond_m2: get_decimal(row, "plafond_m2")?,
            });
        }
        Ok(ceilings)
    }

    async fn create_simulation(
        &self,
        record: NewSimulationRecord,
    ) -> Result<SimulationRecord, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO simulation
                 (tax_year, label, input_json, result_json, economie_impot,
                  comparatif_delta, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.tax_year)
        .bind(&record.label)
        .bind(&record.input_json)
        .bind(&record.result_json)
        .bind(decimal_to_text(record.economie_impot))
        .bind(record.comparatif_delta.map(decimal_to_text))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let id = result.last_insert_rowid();
        info!(id, tax_year = record.tax_year, "simulation saved");
        self.get_simulation(id).await
    }

    async fn get_simulation(&self, id: i64) -> Result<SimulationRecord, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SIMULATION_COLUMNS} FROM simulation WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?
        .ok_or(RepositoryError::NotFound)?;

        row_to_simulation(&row)
    }

    async fn delete_simulation(&self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM simulation WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_simulations(
        &self,
        tax_year: Option<i32>,
    ) -> Result<Vec<SimulationRecord>, RepositoryError> {
        let rows = match tax_year {
            Some(year) => {
                sqlx::query(&format!(
                    "SELECT {SIMULATION_COLUMNS} FROM simulation WHERE tax_year = ? ORDER BY id"
                ))
                .bind(year)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!("SELECT {SIMULATION_COLUMNS} FROM simulation ORDER BY id"))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(row_to_simulation).collect()
    }
}
