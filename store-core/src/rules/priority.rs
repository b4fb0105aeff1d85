//! Specificity scoring and candidate ordering.
//!
//! Each configured scope key at position `i` (0-based, lowest precedence
//! first) is worth `2^(i + 1)` when the rule sets that scope field. With the
//! default order `[product, product_class, pref, country]` the weights are:
//!
//! | key           | weight |
//! |---------------|--------|
//! | product       | 2      |
//! | product_class | 4      |
//! | pref          | 8      |
//! | country       | 16     |

use std::cmp::Ordering;

use crate::models::{ScopePresence, TaxRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    Product,
    ProductClass,
    Pref,
    Country,
}

impl ScopeKey {
    /// Parses a configured priority key such as `product_class_id`.
    /// `region` is accepted as an alias of `pref`.
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_priority_key(raw).as_str() {
            "product" => Some(Self::Product),
            "productclass" => Some(Self::ProductClass),
            "pref" | "region" => Some(Self::Pref),
            "country" => Some(Self::Country),
            _ => None,
        }
    }

    pub fn is_set(&self, scope: &ScopePresence) -> bool {
        match self {
            Self::Product => scope.product,
            Self::ProductClass => scope.product_class,
            Self::Pref => scope.pref,
            Self::Country => scope.country,
        }
    }
}

/// Strips one trailing `_id`, then every underscore, and lowercases.
///
/// ```
/// use store_core::rules::normalize_priority_key;
///
/// assert_eq!(normalize_priority_key("product_class_id"), "productclass");
/// assert_eq!(normalize_priority_key("pref_id"), "pref");
/// assert_eq!(normalize_priority_key("country"), "country");
/// ```
pub fn normalize_priority_key(raw: &str) -> String {
    raw.strip_suffix("_id")
        .unwrap_or(raw)
        .replace('_', "")
        .to_ascii_lowercase()
}

/// Sum of `2^(index + 1)` over the priority keys whose scope field is set.
pub fn specificity_score(scope: ScopePresence, priority: &[ScopeKey]) -> u64 {
    priority
        .iter()
        .enumerate()
        .filter(|(_, key)| key.is_set(&scope))
        .map(|(index, _)| 1u64 << (index + 1))
        .sum()
}

/// A candidate rule together with its specificity score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedRule {
    pub rule: TaxRule,
    pub score: u64,
}

/// Later `apply_date` first; same date falls back to the higher score.
fn compare(a: &RankedRule, b: &RankedRule) -> Ordering {
    b.rule
        .apply_date
        .cmp(&a.rule.apply_date)
        .then_with(|| b.score.cmp(&a.score))
}

/// Scores and orders candidates so the winning rule comes first. The sort is
/// stable, so full ties keep the order the repository returned them in.
pub fn rank_candidates(candidates: Vec<TaxRule>, priority: &[ScopeKey]) -> Vec<RankedRule> {
    let mut ranked: Vec<RankedRule> = candidates
        .into_iter()
        .map(|rule| RankedRule {
            score: specificity_score(rule.scope(), priority),
            rule,
        })
        .collect();

    ranked.sort_by(compare);
    ranked
}
