use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::models::TaxRule;

/// Composite resolution key. Absent dimensions are stored as `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleCacheKey {
    pub product_id: i64,
    pub product_class_id: i64,
    pub pref_id: i64,
    pub country_id: i64,
}

impl RuleCacheKey {
    pub fn new(
        product_id: Option<i64>,
        product_class_id: Option<i64>,
        pref_id: Option<i64>,
        country_id: Option<i64>,
    ) -> Self {
        Self {
            product_id: product_id.unwrap_or(0),
            product_class_id: product_class_id.unwrap_or(0),
            pref_id: pref_id.unwrap_or(0),
            country_id: country_id.unwrap_or(0),
        }
    }
}

impl fmt::Display for RuleCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.product_id, self.product_class_id, self.pref_id, self.country_id
        )
    }
}

/// Resolved rules for one request. Entries are added whole and only ever
/// removed all at once by [`RuleCache::clear`].
#[derive(Debug, Default)]
pub struct RuleCache {
    rules: HashMap<RuleCacheKey, Arc<TaxRule>>,
}

impl RuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &RuleCacheKey) -> Option<Arc<TaxRule>> {
        self.rules.get(key).cloned()
    }

    pub fn insert(&mut self, key: RuleCacheKey, rule: Arc<TaxRule>) {
        self.rules.insert(key, rule);
    }

    pub fn clear(&mut self) {
        self.rules.clear();
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use super::*;

    fn rule() -> Arc<TaxRule> {
        let now = Utc::now();
        Arc::new(TaxRule {
            id: 1,
            product_id: None,
            product_class_id: None,
            pref_id: None,
            country_id: None,
            rounding_type: None,
            tax_rate: dec!(8),
            tax_adjust: dec!(0),
            apply_date: now,
            create_date: now,
            update_date: now,
        })
    }

    #[test]
    fn key_renders_absent_dimensions_as_zero() {
        let key = RuleCacheKey::new(Some(7), None, Some(13), None);
        assert_eq!(key.to_string(), "7:0:13:0");
    }

    #[test]
    fn absent_and_zero_ids_share_a_key() {
        assert_eq!(
            RuleCacheKey::new(None, None, None, None),
            RuleCacheKey::new(Some(0), Some(0), Some(0), Some(0))
        );
    }

    #[test]
    fn get_returns_the_same_shared_rule() {
        let mut cache = RuleCache::new();
        let key = RuleCacheKey::new(None, None, Some(13), None);
        let stored = rule();
        cache.insert(key, stored.clone());

        let hit = cache.get(&key).expect("cached");

        assert!(Arc::ptr_eq(&hit, &stored));
        assert!(cache.get(&RuleCacheKey::new(None, None, None, None)).is_none());
    }

    #[test]
    fn clear_empties_everything() {
        let mut cache = RuleCache::new();
        cache.insert(RuleCacheKey::new(None, None, None, None), rule());
        cache.insert(RuleCacheKey::new(None, None, Some(1), None), rule());
        assert_eq!(cache.len(), 2);

        cache.clear();

        assert!(cache.is_empty());
    }
}
