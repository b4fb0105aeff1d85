use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::cache::{RuleCache, RuleCacheKey};
use super::priority::{ScopeKey, rank_candidates};
use crate::config::{ConfigError, StoreConfig};
use crate::context::AuthContext;
use crate::db::repository::{RepositoryError, ScopeFilter, TaxRuleQuery, TaxRuleRepository};
use crate::models::{
    Country, EntityRef, Identified, NewTaxRule, Pref, Product, ProductClass, TaxRule,
};

/// Rounding type assigned to newly created rules.
const DEFAULT_ROUNDING_TYPE_ID: i32 = 1;

/// What a tax rule is being looked up for. Every dimension is optional.
#[derive(Debug, Clone, Default)]
pub struct RuleContext {
    pub product: Option<EntityRef<Product>>,
    pub product_class: Option<EntityRef<ProductClass>>,
    pub pref: Option<EntityRef<Pref>>,
    pub country: Option<EntityRef<Country>>,
}

impl RuleContext {
    pub fn product(mut self, product: EntityRef<Product>) -> Self {
        self.product = Some(product);
        self
    }

    pub fn product_class(mut self, product_class: EntityRef<ProductClass>) -> Self {
        self.product_class = Some(product_class);
        self
    }

    pub fn pref(mut self, pref: EntityRef<Pref>) -> Self {
        self.pref = Some(pref);
        self
    }

    pub fn country(mut self, country: EntityRef<Country>) -> Self {
        self.country = Some(country);
        self
    }
}

/// Id of an optional argument; `0` counts as absent.
fn present_id<T: Identified>(value: Option<EntityRef<T>>) -> Option<i64> {
    value.map(|value| value.id()).filter(|id| *id != 0)
}

/// Finds the applicable tax rule for a context and administers rules.
///
/// A resolver is meant to live for one request: it memoizes successful
/// resolutions in the [`RuleCache`] it was built with and never invalidates
/// them on its own. Call [`TaxRuleResolver::clear_cache`] after changing
/// rules that may already have been resolved.
pub struct TaxRuleResolver<'a, R: TaxRuleRepository + ?Sized> {
    repository: &'a R,
    auth: &'a dyn AuthContext,
    priority: Vec<ScopeKey>,
    product_tax_rule_enabled: bool,
    cache: RuleCache,
}

impl<'a, R: TaxRuleRepository + ?Sized> TaxRuleResolver<'a, R> {
    pub fn new(
        repository: &'a R,
        auth: &'a dyn AuthContext,
        config: &StoreConfig,
        cache: RuleCache,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            repository,
            auth,
            priority: config.priority_keys()?,
            product_tax_rule_enabled: config.option_product_tax_rule,
            cache,
        })
    }

    /// Returns the rule that applies right now to `context`.
    ///
    /// # Errors
    /// * [`RepositoryError::NotFound`] if no rule applies. Misses are not
    ///   cached.
    /// * Any error the repository returns.
    pub async fn resolve(&mut self, context: RuleContext) -> Result<Arc<TaxRule>, RepositoryError> {
        let mut pref_id = present_id(context.pref);
        let mut country_id = present_id(context.country);

        // Also reached from admin screens whenever a customer session is
        // present.
        if pref_id.is_none() && country_id.is_none() {
            if let Some(customer) = self.auth.authenticated_customer() {
                pref_id = customer.pref.as_ref().map(|pref| i64::from(pref.id));
                country_id = customer.country.as_ref().map(|country| i64::from(country.id));
                debug!(
                    customer_id = customer.id,
                    ?pref_id,
                    ?country_id,
                    "using customer address for tax rule lookup"
                );
            }
        }

        let (product_id, product_class_id) = if self.product_tax_rule_enabled {
            (present_id(context.product), present_id(context.product_class))
        } else {
            (None, None)
        };

        let key = RuleCacheKey::new(product_id, product_class_id, pref_id, country_id);
        if let Some(rule) = self.cache.get(&key) {
            debug!(%key, rule_id = rule.id, "tax rule cache hit");
            return Ok(rule);
        }

        let query = TaxRuleQuery {
            applied_before: Utc::now(),
            product: ScopeFilter::for_id(product_id),
            product_class: ScopeFilter::for_id(product_class_id),
            pref: ScopeFilter::for_id(pref_id),
            country: ScopeFilter::for_id(country_id),
        };
        let candidates = self.repository.find_tax_rule_candidates(&query).await?;
        debug!(%key, candidates = candidates.len(), "queried tax rule candidates");

        let winner = rank_candidates(candidates, &self.priority)
            .into_iter()
            .next()
            .ok_or(RepositoryError::NotFound)?;
        debug!(%key, rule_id = winner.rule.id, score = winner.score, "resolved tax rule");

        let rule = Arc::new(winner.rule);
        self.cache.insert(key, Arc::clone(&rule));
        Ok(rule)
    }

    /// A new, unsaved rule with the default rounding type and no adjustment.
    pub async fn create(&self) -> Result<NewTaxRule, RepositoryError> {
        let rounding_type = self
            .repository
            .find_rounding_type(DEFAULT_ROUNDING_TYPE_ID)
            .await?;
        if rounding_type.is_none() {
            warn!(
                id = DEFAULT_ROUNDING_TYPE_ID,
                "default rounding type is missing; new tax rule has none"
            );
        }

        Ok(NewTaxRule {
            product_id: None,
            product_class_id: None,
            pref_id: None,
            country_id: None,
            rounding_type,
            tax_rate: Decimal::ZERO,
            tax_adjust: Decimal::ZERO,
            apply_date: Utc::now(),
        })
    }

    /// Store-wide rules (no product or product class), newest first.
    pub async fn list_defaults(&self) -> Result<Vec<TaxRule>, RepositoryError> {
        self.repository.list_default_tax_rules().await
    }

    pub async fn find(&self, id: i64) -> Result<Option<TaxRule>, RepositoryError> {
        self.repository.find_tax_rule(id).await
    }

    pub async fn find_by_apply_date(
        &self,
        apply_date: DateTime<Utc>,
    ) -> Result<Option<TaxRule>, RepositoryError> {
        self.repository.find_tax_rule_by_apply_date(apply_date).await
    }

    pub async fn save(&self, rule: NewTaxRule) -> Result<TaxRule, RepositoryError> {
        let saved = self.repository.insert_tax_rule(rule).await?;
        info!(rule_id = saved.id, "created tax rule");
        Ok(saved)
    }

    pub async fn update(&self, rule: &TaxRule) -> Result<(), RepositoryError> {
        self.repository.update_tax_rule(rule).await?;
        info!(rule_id = rule.id, "updated tax rule");
        Ok(())
    }

    /// Deletes a rule given either its id or the rule itself.
    ///
    /// # Errors
    /// * [`RepositoryError::NotFound`] if the rule does not exist; nothing is
    ///   removed in that case.
    pub async fn delete(&self, rule: EntityRef<TaxRule>) -> Result<(), RepositoryError> {
        let id = match rule {
            EntityRef::Entity(rule) => rule.id,
            EntityRef::Id(id) => {
                self.repository
                    .find_tax_rule(id)
                    .await?
                    .ok_or(RepositoryError::NotFound)?
                    .id
            }
        };

        self.repository.remove_tax_rule(id).await?;
        info!(rule_id = id, "deleted tax rule");
        Ok(())
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache(&self) -> &RuleCache {
        &self.cache
    }
}
