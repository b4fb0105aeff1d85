pub mod backend;
pub mod loader;
pub mod logging;

pub use backend::build_registry;
pub use loader::{TaxRuleLoader, TaxRuleLoaderError, TaxRuleRecord};
