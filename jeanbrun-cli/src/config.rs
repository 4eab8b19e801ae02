//! TOML configuration for the `jeanbrun` binary.
//!
//! ```toml
//! default_tax_year = 2026
//!
//! [database]
//! backend = "sqlite"
//! connection = "jeanbrun.db"
//!
//! [logging]
//! level = "info"
//! file = "jeanbrun.log"
//!
//! [features]
//! jeanbrun_enabled = true
//! lmnp_enabled = false
//! ```
//!
//! The `[features]` keys also accept the camelCase spelling used in JSON.
//!
//! Every section is optional. Without a `[database]` section the built-in
//! rule tables are used and simulations cannot be saved.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use jeanbrun_core::calculations::SimulationOptions;
use jeanbrun_core::db::DbConfig;
use serde::Deserialize;

/// File read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "jeanbrun.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSection {
    #[serde(default = "default_backend")]
    pub backend: String,
    pub connection: String,
}

fn default_backend() -> String {
    "sqlite".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub default_tax_year: Option<i32>,
    pub database: Option<DatabaseSection>,
    pub logging: LoggingSection,
    pub features: SimulationOptions,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backend: Option<String>,
    pub db: Option<String>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid configuration")
    }

    /// Read `path`, or [`DEFAULT_CONFIG_FILE`] when no path is given.
    ///
    /// A missing default file yields the default configuration; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !explicit && !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read config file '{}'", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in '{}'", path.display()))
    }

    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(connection) = overrides.db {
            let backend = overrides
                .backend
                .or_else(|| self.database.take().map(|db| db.backend))
                .unwrap_or_else(default_backend);
            self.database = Some(DatabaseSection {
                backend,
                connection,
            });
        } else if let (Some(backend), Some(db)) = (overrides.backend, self.database.as_mut()) {
            db.backend = backend;
        }
        if overrides.log_level.is_some() {
            self.logging.level = overrides.log_level;
        }
        if overrides.log_file.is_some() {
            self.logging.file = overrides.log_file;
        }
        self
    }

    /// Repository configuration, if a database is configured.
    pub fn db_config(&self) -> Option<DbConfig> {
        self.database.as_ref().map(|db| DbConfig {
            backend: db.backend.clone(),
            connection_string: db.connection.clone(),
        })
    }
}
