//! Backend selection for the rule repository.
//!
//! Front ends hold a [`RepositoryRegistry`] filled at startup with one
//! [`RepositoryFactory`] per compiled-in backend, then turn a [`DbConfig`]
//! (usually read from the `[database]` section of the configuration file)
//! into a boxed [`RuleRepository`].

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use super::repository::{RepositoryError, RuleRepository};

/// Which backend to open, and how to reach it.
///
/// | backend  | connection_string                               |
/// |----------|-------------------------------------------------|
/// | `sqlite` | `jeanbrun.db`, `sqlite:jeanbrun.db`, `:memory:` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Backend name, matched case-insensitively.
    pub backend: String,
    /// Handed to the backend as is.
    pub connection_string: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        }
    }
}

/// Opens repositories for one backend.
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    /// Lowercase name the backend is registered under.
    fn backend_name(&self) -> &'static str;

    /// Connects and returns a repository with its schema and seed rules in place.
    async fn create(&self, config: &DbConfig) -> Result<Box<dyn RuleRepository>, RepositoryError>;
}

#[derive(Default)]
pub struct RepositoryRegistry {
    factories: HashMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a backend. A later factory with the same name wins.
    pub fn register(&mut self, factory: Box<dyn RepositoryFactory>) {
        self.factories.insert(factory.backend_name(), factory);
    }

    pub fn supports(&self, backend: &str) -> bool {
        self.factory(backend).is_some()
    }

    /// Registered backend names, sorted.
    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Opens the backend named by `config.backend`.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Configuration`] for an unregistered backend, or
    /// whatever the backend's factory reports.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn RuleRepository>, RepositoryError> {
        let Some(factory) = self.factory(&config.backend) else {
            return Err(RepositoryError::Configuration(format!(
                "unknown backend '{}'; available: {:?}",
                config.backend,
                self.available_backends()
            )));
        };
        debug!(backend = factory.backend_name(), "creating repository");
        factory.create(config).await
    }

    fn factory(
        &self,
        backend: &str,
    ) -> Option<&dyn RepositoryFactory> {
        self.factories
            .get(backend.trim().to_ascii_lowercase().as_str())
            .map(Box::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::db::repository::tests::MemoryRepository;

    /// Counts how often it was asked for a repository.
    struct CountingFactory {
        name: &'static str,
        opened: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RepositoryFactory for CountingFactory {
        fn backend_name(&self) -> &'static str {
            self.name
        }

        async fn create(
            &self,
            _config: &DbConfig,
        ) -> Result<Box<dyn RuleRepository>, RepositoryError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MemoryRepository::default()))
        }
    }

    struct UnreachableFactory;

    #[async_trait]
    impl RepositoryFactory for UnreachableFactory {
        fn backend_name(&self) -> &'static str {
            "remote"
        }

        async fn create(
            &self,
            config: &DbConfig,
        ) -> Result<Box<dyn RuleRepository>, RepositoryError> {
            Err(RepositoryError::Connection(format!(
                "cannot reach {}",
                config.connection_string
            )))
        }
    }

    fn counting(name: &'static str) -> (Box<dyn RepositoryFactory>, Arc<AtomicUsize>) {
        let opened = Arc::new(AtomicUsize::new(0));
        let factory = CountingFactory {
            name,
            opened: Arc::clone(&opened),
        };
        (Box::new(factory), opened)
    }

    fn db(backend: &str) -> DbConfig {
        DbConfig {
            backend: backend.to_string(),
            ..DbConfig::default()
        }
    }

    #[test]
    fn default_config_is_in_memory_sqlite() {
        assert_eq!(
            DbConfig::default(),
            DbConfig {
                backend: "sqlite".to_string(),
                connection_string: ":memory:".to_string(),
            }
        );
    }

    #[test]
    fn new_registry_supports_nothing() {
        let registry = RepositoryRegistry::new();

        assert!(registry.available_backends().is_empty());
        assert!(!registry.supports("sqlite"));
    }

    #[test]
    fn backends_are_listed_in_order() {
        let mut registry = RepositoryRegistry::new();
        registry.register(counting("sqlite").0);
        registry.register(Box::new(UnreachableFactory));

        assert_eq!(registry.available_backends(), vec!["remote", "sqlite"]);
    }

    #[test]
    fn backend_names_ignore_case_and_padding() {
        let mut registry = RepositoryRegistry::new();
        registry.register(counting("sqlite").0);

        assert!(registry.supports("SQLite"));
        assert!(registry.supports(" sqlite "));
        assert!(!registry.supports("sqlite3"));
    }

    #[tokio::test]
    async fn later_registration_replaces_earlier() {
        let mut registry = RepositoryRegistry::new();
        let (first, first_opened) = counting("sqlite");
        let (second, second_opened) = counting("sqlite");
        registry.register(first);
        registry.register(second);

        registry.create(&db("sqlite")).await.unwrap();

        assert_eq!(registry.available_backends(), vec!["sqlite"]);
        assert_eq!(first_opened.load(Ordering::SeqCst), 0);
        assert_eq!(second_opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn create_opens_only_the_requested_backend() {
        let mut registry = RepositoryRegistry::new();
        let (sqlite, sqlite_opened) = counting("sqlite");
        let (other, other_opened) = counting("other");
        registry.register(sqlite);
        registry.register(other);

        let repo = registry.create(&db("SQLITE")).await.unwrap();

        assert_eq!(repo.list_tax_years().await.unwrap(), vec![2025, 2026]);
        assert_eq!(sqlite_opened.load(Ordering::SeqCst), 1);
        assert_eq!(other_opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_backend_lists_the_registered_ones() {
        let mut registry = RepositoryRegistry::new();
        registry.register(counting("sqlite").0);

        let Err(err) = registry.create(&db("postgres")).await else {
            panic!("postgres is not registered");
        };

        assert_eq!(
            err,
            RepositoryError::Configuration(
                "unknown backend 'postgres'; available: [\"sqlite\"]".to_string()
            )
        );
    }

    #[tokio::test]
    async fn factory_errors_reach_the_caller() {
        let mut registry = RepositoryRegistry::new();
        registry.register(Box::new(UnreachableFactory));

        let Err(err) = registry.create(&db("remote")).await else {
            panic!("remote factory always fails");
        };

        assert_eq!(err, RepositoryError::Connection("cannot reach :memory:".to_string()));
    }
}
