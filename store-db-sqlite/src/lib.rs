//! SQLite backend for the store repositories.
//!
//! [`SqliteRepository`] implements every repository trait from
//! `store_core::db`; [`SqliteRepositoryFactory`] plugs it into a
//! [`store_core::db::RepositoryRegistry`] under the `"sqlite"` name.

pub mod decimal;
pub mod factory;
pub mod repository;

pub use factory::SqliteRepositoryFactory;
pub use repository::SqliteRepository;
