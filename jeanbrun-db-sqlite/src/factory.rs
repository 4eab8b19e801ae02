use std::path::PathBuf;

use async_trait::async_trait;
use jeanbrun_core::db::{DbConfig, RepositoryFactory};
use jeanbrun_core::{RepositoryError, RuleRepository};

use crate::repository::SqliteRepository;

/// Resolve the seeds directory at runtime.
///
/// Resolution order:
/// 1. **`JEANBRUN_DB_SQLITE_SEEDS_DIR`** if set.
/// 2. **`./seeds`** if the directory exists in the current working directory.
/// 3. **`$CARGO_MANIFEST_DIR/seeds`** as last resort (dev/tests from the build tree).
fn seeds_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("JEANBRUN_DB_SQLITE_SEEDS_DIR") {
        return PathBuf::from(dir);
    }
    let cwd_seeds = PathBuf::from("./seeds");
    if cwd_seeds.is_dir() {
        return cwd_seeds;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds")
}

/// Map a [`DbConfig`] connection string to a sqlx URL.
///
/// `:memory:` and bare file paths are accepted; anything already starting
/// with `sqlite:` is passed through.
fn database_url(connection_string: &str) -> String {
    let trimmed = connection_string.trim();
    if trimmed.starts_with("sqlite:") {
        trimmed.to_string()
    } else if trimmed == ":memory:" {
        "sqlite::memory:".to_string()
    } else {
        format!("sqlite:{trimmed}?mode=rwc")
    }
}

/// [`RepositoryFactory`] for SQLite.
///
/// ```rust,no_run
/// use jeanbrun_core::db::RepositoryRegistry;
/// use jeanbrun_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Open the database, apply migrations, then apply seeds.
    ///
    /// Seeds only fill tables that are still empty for their year, so data
    /// loaded later from CSV survives a restart.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn RuleRepository>, RepositoryError> {
        let repo = SqliteRepository::new(&database_url(&config.connection_string)).await?;
        repo.run_migrations().await?;
        repo.run_seeds(&seeds_dir())
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;
        Ok(Box::new(repo))
    }
}
