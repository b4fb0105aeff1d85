pub mod calculations;
pub mod config;
pub mod context;
pub mod db;
pub mod form;
pub mod models;
pub mod rules;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{ConfigError, StoreConfig};
pub use context::{AuthContext, Principal, RequestContext, RequestParams};
pub use db::repository::{
    ReferenceRepository, RepositoryError, ScopeFilter, ShipmentItemRepository, StoreRepository,
    TaxRuleQuery, TaxRuleRepository,
};
pub use models::*;
