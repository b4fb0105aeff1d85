//! Tax rule resolution.
//!
//! Given a product / product class / prefecture / country context, the
//! resolver picks the single applicable [`TaxRule`](crate::models::TaxRule):
//! the most recently applied one, with ties broken by how specifically it is
//! scoped according to the configured priority order.

pub mod cache;
pub mod priority;
pub mod resolver;

pub use cache::{RuleCache, RuleCacheKey};
pub use priority::{RankedRule, ScopeKey, normalize_priority_key, rank_candidates, specificity_score};
pub use resolver::{RuleContext, TaxRuleResolver};
