use store_core::db::RepositoryRegistry;
use store_db_sqlite::SqliteRepositoryFactory;

/// Every storage backend this crate is built with.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}
