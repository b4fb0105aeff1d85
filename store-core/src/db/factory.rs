use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;

use super::repository::{RepositoryError, StoreRepository};

/// Where the store lives and how to prepare it before use.
///
/// `connection_string` is handed to the backend unchanged; for `sqlite` it is
/// a path, a `sqlite:` URL or `:memory:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Name of a registered backend, e.g. `"sqlite"`.
    pub backend: String,
    pub connection_string: String,
    /// Bring the schema up to date after connecting.
    pub migrate: bool,
    /// Directory of seed scripts to apply after migrating.
    pub seeds_dir: Option<PathBuf>,
}

impl DbConfig {
    pub fn new(backend: impl Into<String>, connection_string: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            connection_string: connection_string.into(),
            migrate: false,
            seeds_dir: None,
        }
    }

    pub fn with_migrations(mut self, migrate: bool) -> Self {
        self.migrate = migrate;
        self
    }

    pub fn with_seeds(mut self, seeds_dir: Option<PathBuf>) -> Self {
        self.seeds_dir = seeds_dir;
        self
    }
}

/// A throwaway migrated in-memory SQLite store.
impl Default for DbConfig {
    fn default() -> Self {
        Self::new("sqlite", ":memory:").with_migrations(true)
    }
}

/// Opens a [`StoreRepository`] for one storage backend.
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn create(&self, config: &DbConfig)
    -> Result<Box<dyn StoreRepository>, RepositoryError>;
}

/// The storage backends a binary was built with, looked up by
/// [`DbConfig::backend`].
#[derive(Default)]
pub struct RepositoryRegistry {
    factories: BTreeMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a backend. A later factory with the same name wins.
    pub fn register(&mut self, factory: Box<dyn RepositoryFactory>) {
        self.factories.insert(factory.backend_name(), factory);
    }

    /// Registered backend names in alphabetical order.
    pub fn available_backends(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    /// Opens the store described by `config`.
    ///
    /// # Errors
    /// * [`RepositoryError::Configuration`] for a backend that is not
    ///   registered.
    /// * Whatever the backend's factory returns.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn StoreRepository>, RepositoryError> {
        let Some(factory) = self.factories.get(config.backend.as_str()) else {
            return Err(RepositoryError::Configuration(format!(
                "backend '{}' is not available (built with: {})",
                config.backend,
                self.available_backends().join(", ")
            )));
        };
        factory.create(config).await
    }
}
