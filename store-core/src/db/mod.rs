pub mod factory;
pub mod repository;

pub use factory::{DbConfig, RepositoryFactory, RepositoryRegistry};
pub use repository::{
    ReferenceRepository, RepositoryError, ScopeFilter, ShipmentItemRepository, StoreRepository,
    TaxRuleQuery, TaxRuleRepository,
};
