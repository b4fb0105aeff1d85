use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    Master, MasterKind, NewTaxRule, Order, Product, ProductClass, ShipmentItem, Shipping, TaxRule,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// How a nullable scope column participates in a candidate query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeFilter {
    /// `column IS NULL`
    IsNull,
    /// `column IS NULL OR column = id`
    NullOr(i64),
}

impl ScopeFilter {
    /// `NullOr` only for ids greater than zero.
    pub fn for_id(id: Option<i64>) -> Self {
        match id {
            Some(id) if id > 0 => Self::NullOr(id),
            _ => Self::IsNull,
        }
    }

    pub fn matches(&self, value: Option<i64>) -> bool {
        match (self, value) {
            (_, None) => true,
            (Self::IsNull, Some(_)) => false,
            (Self::NullOr(id), Some(value)) => *id == value,
        }
    }
}

/// Candidate selection for tax rule resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxRuleQuery {
    /// Only rules whose `apply_date` is strictly before this instant.
    pub applied_before: DateTime<Utc>,
    pub product: ScopeFilter,
    pub product_class: ScopeFilter,
    pub pref: ScopeFilter,
    pub country: ScopeFilter,
}

impl TaxRuleQuery {
    pub fn matches(&self, rule: &TaxRule) -> bool {
        rule.apply_date < self.applied_before
            && self.product.matches(rule.product_id)
            && self.product_class.matches(rule.product_class_id)
            && self.pref.matches(rule.pref_id.map(i64::from))
            && self.country.matches(rule.country_id.map(i64::from))
    }
}

#[async_trait]
pub trait TaxRuleRepository: Send + Sync {
    /// Rules matching `query`, ordered by `apply_date` then `id`, both
    /// descending.
    async fn find_tax_rule_candidates(
        &self,
        query: &TaxRuleQuery,
    ) -> Result<Vec<TaxRule>, RepositoryError>;

    /// Rules with neither product nor product class, newest `apply_date`
    /// first.
    async fn list_default_tax_rules(&self) -> Result<Vec<TaxRule>, RepositoryError>;

    async fn find_tax_rule(&self, id: i64) -> Result<Option<TaxRule>, RepositoryError>;

    async fn find_tax_rule_by_apply_date(
        &self,
        apply_date: DateTime<Utc>,
    ) -> Result<Option<TaxRule>, RepositoryError>;

    async fn insert_tax_rule(&self, rule: NewTaxRule) -> Result<TaxRule, RepositoryError>;

    async fn update_tax_rule(&self, rule: &TaxRule) -> Result<(), RepositoryError>;

    /// Removes the rule and persists the removal before returning.
    async fn remove_tax_rule(&self, id: i64) -> Result<(), RepositoryError>;

    async fn find_rounding_type(&self, id: i32) -> Result<Option<Master>, RepositoryError>;
}

#[async_trait]
pub trait ShipmentItemRepository: Send + Sync {
    async fn find_shipment_item(&self, id: i64) -> Result<Option<ShipmentItem>, RepositoryError>;

    async fn update_shipment_item(&self, item: &ShipmentItem) -> Result<(), RepositoryError>;
}

/// Lookups used to turn submitted ids back into entities.
#[async_trait]
pub trait ReferenceRepository: Send + Sync {
    async fn find_master(
        &self,
        kind: MasterKind,
        id: i32,
    ) -> Result<Option<Master>, RepositoryError>;

    async fn find_product(&self, id: i64) -> Result<Option<Product>, RepositoryError>;

    async fn find_product_class(&self, id: i64) -> Result<Option<ProductClass>, RepositoryError>;

    async fn find_order(&self, id: i64) -> Result<Option<Order>, RepositoryError>;

    async fn find_shipping(&self, id: i64) -> Result<Option<Shipping>, RepositoryError>;
}

/// Everything a storage backend provides.
pub trait StoreRepository: TaxRuleRepository + ShipmentItemRepository + ReferenceRepository {}

impl<T> StoreRepository for T where T: TaxRuleRepository + ShipmentItemRepository + ReferenceRepository
{}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_id_ignores_missing_and_non_positive_ids() {
        assert_eq!(ScopeFilter::for_id(None), ScopeFilter::IsNull);
        assert_eq!(ScopeFilter::for_id(Some(0)), ScopeFilter::IsNull);
        assert_eq!(ScopeFilter::for_id(Some(-3)), ScopeFilter::IsNull);
        assert_eq!(ScopeFilter::for_id(Some(5)), ScopeFilter::NullOr(5));
    }

    #[test]
    fn null_or_accepts_unscoped_and_equal_values() {
        let filter = ScopeFilter::NullOr(5);
        assert!(filter.matches(None));
        assert!(filter.matches(Some(5)));
        assert!(!filter.matches(Some(6)));
    }

    #[test]
    fn is_null_rejects_any_scoped_value() {
        assert!(ScopeFilter::IsNull.matches(None));
        assert!(!ScopeFilter::IsNull.matches(Some(5)));
    }
}
