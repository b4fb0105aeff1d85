use async_trait::async_trait;
use store_core::db::{DbConfig, RepositoryError, RepositoryFactory, StoreRepository};
use tracing::info;

use crate::repository::SqliteRepository;

/// The `"sqlite"` backend.
///
/// ```rust,no_run
/// use store_core::db::RepositoryRegistry;
/// use store_db_sqlite::SqliteRepositoryFactory;
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

    /// Connects, then runs migrations and seeds as `config` asks.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn StoreRepository>, RepositoryError> {
        let repo = SqliteRepository::new(&config.connection_string)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{e:#}")))?;

        if config.migrate {
            repo.run_migrations()
                .await
                .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;
        }
        if let Some(seeds_dir) = &config.seeds_dir {
            repo.run_seeds(seeds_dir)
                .await
                .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;
        }

        info!(
            database = %config.connection_string,
            migrated = config.migrate,
            seeded = config.seeds_dir.is_some(),
            "opened sqlite store"
        );
        Ok(Box::new(repo))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use store_core::TaxRuleRepository;
    use store_core::db::{DbConfig, RepositoryError, RepositoryFactory, RepositoryRegistry};

    use super::SqliteRepositoryFactory;

    fn bundled_seeds() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds")
    }

    #[tokio::test]
    async fn creates_migrated_and_seeded_memory_store() {
        let config = DbConfig::new("sqlite", ":memory:")
            .with_migrations(true)
            .with_seeds(Some(bundled_seeds()));

        let repo = SqliteRepositoryFactory
            .create(&config)
            .await
            .expect("failed to create in-memory repository");

        let defaults = repo.list_default_tax_rules().await.unwrap();
        assert_eq!(defaults.len(), 2);
        assert!(repo.find_rounding_type(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn migrated_store_without_seeds_is_empty() {
        let repo = SqliteRepositoryFactory
            .create(&DbConfig::default())
            .await
            .expect("failed to create in-memory repository");

        assert!(repo.list_default_tax_rules().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn seeds_without_migrations_fail() {
        let config = DbConfig::new("sqlite", ":memory:").with_seeds(Some(bundled_seeds()));

        let result = SqliteRepositoryFactory.create(&config).await;

        assert!(matches!(result, Err(RepositoryError::Database(_))));
    }

    #[tokio::test]
    async fn registry_dispatches_to_sqlite() {
        let mut registry = RepositoryRegistry::new();
        registry.register(Box::new(SqliteRepositoryFactory));

        let repo = registry.create(&DbConfig::default()).await;

        assert!(repo.is_ok());
        assert_eq!(registry.available_backends(), vec!["sqlite"]);
    }
}
