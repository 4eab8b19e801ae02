use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    JeanbrunRateTier, MicroBicAllowance, NewSimulationRecord, PropertyComponent, RentCeiling,
    SimulationRecord, TaxBracket, TaxYearConfig, TaxYearRules,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Storage for yearly rule tables and saved simulations.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    // Tax year config
    async fn get_tax_year_config(&self, year: i32) -> Result<TaxYearConfig, RepositoryError>;
    async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError>;

    // Income tax brackets
    async fn get_tax_brackets(&self, tax_year: i32) -> Result<Vec<TaxBracket>, RepositoryError>;
    async fn insert_tax_bracket(&self, bracket: &TaxBracket) -> Result<(), RepositoryError>;
    async fn delete_tax_brackets(&self, tax_year: i32) -> Result<(), RepositoryError>;

    // Micro-BIC allowances
    async fn get_micro_bic_allowances(
        &self,
        tax_year: i32,
    ) -> Result<Vec<MicroBicAllowance>, RepositoryError>;

    // Property components
    async fn get_property_components(
        &self,
        tax_year: i32,
    ) -> Result<Vec<PropertyComponent>, RepositoryError>;

    // Jeanbrun rate tiers
    async fn get_jeanbrun_tiers(
        &self,
        tax_year: i32,
    ) -> Result<Vec<JeanbrunRateTier>, RepositoryError>;
    async fn insert_jeanbrun_tier(&self, tier: &JeanbrunRateTier) -> Result<(), RepositoryError>;
    async fn delete_jeanbrun_tiers(&self, tax_year: i32) -> Result<(), RepositoryError>;

    // Rent ceilings
    async fn get_rent_ceilings(&self, tax_year: i32) -> Result<Vec<RentCeiling>, RepositoryError>;

    // Saved simulations
    async fn create_simulation(
        &self,
        record: NewSimulationRecord,
    ) -> Result<SimulationRecord, RepositoryError>;

    async fn get_simulation(&self, id: i64) -> Result<SimulationRecord, RepositoryError>;

    async fn delete_simulation(&self, id: i64) -> Result<(), RepositoryError>;

    async fn list_simulations(
        &self,
        tax_year: Option<i32>,
    ) -> Result<Vec<SimulationRecord>, RepositoryError>;

    /// Assembles and validates every table for `year`.
    ///
    /// # Errors
    ///
    /// - [`RepositoryError::NotFound`] if the year has no configuration
    /// - [`RepositoryError::Configuration`] if the stored tables are inconsistent
    async fn load_rules(&self, year: i32) -> Result<TaxYearRules, RepositoryError> {
        let rules = TaxYearRules {
            config: self.get_tax_year_config(year).await?,
            brackets: self.get_tax_brackets(year).await?,
            micro_bic: self.get_micro_bic_allowances(year).await?,
            components: self.get_property_components(year).await?,
            jeanbrun_tiers: self.get_jeanbrun_tiers(year).await?,
            rent_ceilings: self.get_rent_ceilings(year).await?,
        };
        rules.validate().map_err(|err| {
            RepositoryError::Configuration(format!("rules for {year} are invalid: {err}"))
        })?;
        Ok(rules)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    /// Repository over in-memory rule tables, seeded with the built-in years.
    pub(crate) struct MemoryRepository {
        rules: Mutex<Vec<TaxYearRules>>,
        simulations: Mutex<Vec<SimulationRecord>>,
    }

    impl Default for MemoryRepository {
        fn default() -> Self {
            let rules = TaxYearRules::builtin_years()
                .into_iter()
                .filter_map(TaxYearRules::builtin)
                .cloned()
                .collect();
            Self {
                rules: Mutex::new(rules),
                simulations: Mutex::new(Vec::new()),
            }
        }
    }

    impl MemoryRepository {
        fn with_year<T>(
            &self,
            year: i32,
            f: impl FnOnce(&mut TaxYearRules) -> T,
        ) -> Result<T, RepositoryError> {
            let mut rules = self.rules.lock().unwrap();
            rules
                .iter_mut()
                .find(|r| r.tax_year() == year)
                .map(f)
                .ok_or(RepositoryError::NotFound)
        }
    }

    #[async_trait]
    impl RuleRepository for MemoryRepository {
        async fn get_tax_year_config(&self, year: i32) -> Result<TaxYearConfig, RepositoryError> {
            self.with_year(year, |r| r.config.clone())
        }
        async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError> {
            Ok(self.rules.lock().unwrap().iter().map(TaxYearRules::tax_year).collect())
        }
        async fn get_tax_brackets(&self, tax_year: i32) -> Result<Vec<TaxBracket>, RepositoryError> {
            self.with_year(tax_year, |r| r.brackets.clone())
        }
        async fn insert_tax_bracket(&self, bracket: &TaxBracket) -> Result<(), RepositoryError> {
            self.with_year(bracket.tax_year, |r| r.brackets.push(bracket.clone()))
        }
        async fn delete_tax_brackets(&self, tax_year: i32) -> Result<(), RepositoryError> {
            self.with_year(tax_year, |r| r.brackets.clear())
        }
        async fn get_micro_bic_allowances(
            &self,
            tax_year: i32,
        ) -> Result<Vec<MicroBicAllowance>, RepositoryError> {
            self.with_year(tax_year, |r| r.micro_bic.clone())
        }
        async fn get_property_components(
            &self,
            tax_year: i32,
        ) -> Result<Vec<PropertyComponent>, RepositoryError> {
            self.with_year(tax_year, |r| r.components.clone())
        }
        async fn get_jeanbrun_tiers(
            &self,
            tax_year: i32,
        ) -> Result<Vec<JeanbrunRateTier>, RepositoryError> {
            self.with_year(tax_year, |r| r.jeanbrun_tiers.clone())
        }
        async fn insert_jeanbrun_tier(&self, tier: &JeanbrunRateTier) -> Result<(), RepositoryError> {
            self.with_year(tier.tax_year, |r| r.jeanbrun_tiers.push(tier.clone()))
        }
        async fn delete_jeanbrun_tiers(&self, tax_year: i32) -> Result<(), RepositoryError> {
            self.with_year(tax_year, |r| r.jeanbrun_tiers.clear())
        }
        async fn get_rent_ceilings(&self, tax_year: i32) -> Result<Vec<RentCeiling>, RepositoryError> {
            self.with_year(tax_year, |r| r.rent_ceilings.clone())
        }
        async fn create_simulation(
            &self,
            record: NewSimulationRecord,
        ) -> Result<SimulationRecord, RepositoryError> {
            let mut simulations = self.simulations.lock().unwrap();
            let stored = SimulationRecord {
                id: simulations.len() as i64 + 1,
                tax_year: record.tax_year,
                label: record.label,
                input_json: record.input_json,
                result_json: record.result_json,
                economie_impot: record.economie_impot,
                comparatif_delta: record.comparatif_delta,
                created_at: Utc::now(),
            };
            simulations.push(stored.clone());
            Ok(stored)
        }
        async fn get_simulation(&self, id: i64) -> Result<SimulationRecord, RepositoryError> {
            self.simulations
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.id == id)
                .cloned()
                .ok_or(RepositoryError::NotFound)
        }
        async fn delete_simulation(&self, id: i64) -> Result<(), RepositoryError> {
            let mut simulations = self.simulations.lock().unwrap();
            let before = simulations.len();
            simulations.retain(|s| s.id != id);
            if simulations.len() == before {
                return Err(RepositoryError::NotFound);
            }
            Ok(())
        }
        async fn list_simulations(
            &self,
            tax_year: Option<i32>,
        ) -> Result<Vec<SimulationRecord>, RepositoryError> {
            Ok(self
                .simulations
                .lock()
                .unwrap()
                .iter()
                .filter(|s| tax_year.is_none_or(|y| s.tax_year == y))
                .cloned()
                .collect())
        }
    }

    #[tokio::test]
    async fn load_rules_assembles_every_table() {
        let repo = MemoryRepository::default();

        let rules = repo.load_rules(2026).await.unwrap();

        assert_eq!(&rules, TaxYearRules::builtin(2026).unwrap());
    }

    #[tokio::test]
    async fn load_rules_unknown_year_is_not_found() {
        let repo = MemoryRepository::default();

        assert_eq!(repo.load_rules(1990).await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn load_rules_rejects_inconsistent_tables() {
        let repo = MemoryRepository::default();
        repo.delete_tax_brackets(2026).await.unwrap();

        match repo.load_rules(2026).await {
            Err(RepositoryError::Configuration(msg)) => {
                assert!(msg.contains("2026"));
                assert!(msg.contains("no tax brackets"));
            }
            other => panic!("expected Configuration error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn simulations_round_trip_through_repository() {
        let repo = MemoryRepository::default();
        let created = repo
            .create_simulation(NewSimulationRecord {
                tax_year: 2026,
                label: Some("T2 Lyon".to_string()),
                input_json: "{}".to_string(),
                result_json: "{}".to_string(),
                economie_impot: dec!(51480.00),
                comparatif_delta: None,
            })
            .await
            .unwrap();

        assert_eq!(repo.get_simulation(created.id).await.unwrap(), created);
        assert_eq!(repo.list_simulations(Some(2025)).await.unwrap(), vec![]);

        repo.delete_simulation(created.id).await.unwrap();
        assert_eq!(
            repo.delete_simulation(created.id).await,
            Err(RepositoryError::NotFound)
        );
    }
}
