//! In-memory repository doubles for unit tests.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::db::repository::{
    ReferenceRepository, RepositoryError, ShipmentItemRepository, TaxRuleQuery, TaxRuleRepository,
};
use crate::models::{
    Master, MasterKind, NewTaxRule, Order, Product, ProductClass, ShipmentItem, Shipping, TaxRule,
};

pub fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// An unscoped rule; override fields with struct update syntax.
pub fn tax_rule(id: i64, apply_date: DateTime<Utc>, tax_rate: Decimal) -> TaxRule {
    TaxRule {
        id,
        product_id: None,
        product_class_id: None,
        pref_id: None,
        country_id: None,
        rounding_type: None,
        tax_rate,
        tax_adjust: Decimal::ZERO,
        apply_date,
        create_date: apply_date,
        update_date: apply_date,
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    tax_rules: RwLock<Vec<TaxRule>>,
    masters: RwLock<HashMap<(MasterKind, i32), Master>>,
    products: RwLock<HashMap<i64, Product>>,
    product_classes: RwLock<HashMap<i64, ProductClass>>,
    orders: RwLock<HashMap<i64, Order>>,
    shippings: RwLock<HashMap<i64, Shipping>>,
    shipment_items: RwLock<HashMap<i64, ShipmentItem>>,
    candidate_queries: AtomicUsize,
    removals: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tax_rule(self, rule: TaxRule) -> Self {
        self.tax_rules.write().unwrap().push(rule);
        self
    }

    pub fn with_rounding_type(self, master: Master) -> Self {
        self.with_master(MasterKind::RoundingType, master)
    }

    pub fn with_master(self, kind: MasterKind, master: Master) -> Self {
        self.masters.write().unwrap().insert((kind, master.id), master);
        self
    }

    pub fn with_product(self, product: Product) -> Self {
        self.products.write().unwrap().insert(product.id, product);
        self
    }

    pub fn with_product_class(self, product_class: ProductClass) -> Self {
        self.product_classes
            .write()
            .unwrap()
            .insert(product_class.id, product_class);
        self
    }

    pub fn with_order(self, order: Order) -> Self {
        self.orders.write().unwrap().insert(order.id, order);
        self
    }

    pub fn with_shipping(self, shipping: Shipping) -> Self {
        self.shippings.write().unwrap().insert(shipping.id, shipping);
        self
    }

    pub fn with_shipment_item(self, item: ShipmentItem) -> Self {
        self.shipment_items.write().unwrap().insert(item.id, item);
        self
    }

    /// Number of `find_tax_rule_candidates` calls so far.
    pub fn candidate_queries(&self) -> usize {
        self.candidate_queries.load(Ordering::SeqCst)
    }

    /// Number of successful `remove_tax_rule` calls so far.
    pub fn removals(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }

    pub fn tax_rule_count(&self) -> usize {
        self.tax_rules.read().unwrap().len()
    }
}

fn newest_first(rules: &mut [TaxRule]) {
    rules.sort_by(|a, b| b.apply_date.cmp(&a.apply_date).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl TaxRuleRepository for InMemoryStore {
    async fn find_tax_rule_candidates(
        &self,
        query: &TaxRuleQuery,
    ) -> Result<Vec<TaxRule>, RepositoryError> {
        self.candidate_queries.fetch_add(1, Ordering::SeqCst);
        let mut rules: Vec<_> = self
            .tax_rules
            .read()
            .unwrap()
            .iter()
            .filter(|rule| query.matches(rule))
            .cloned()
            .collect();
        newest_first(&mut rules);
        Ok(rules)
    }

    async fn list_default_tax_rules(&self) -> Result<Vec<TaxRule>, RepositoryError> {
        let mut rules: Vec<_> = self
            .tax_rules
            .read()
            .unwrap()
            .iter()
            .filter(|rule| rule.is_default())
            .cloned()
            .collect();
        newest_first(&mut rules);
        Ok(rules)
    }

    async fn find_tax_rule(&self, id: i64) -> Result<Option<TaxRule>, RepositoryError> {
        Ok(self
            .tax_rules
            .read()
            .unwrap()
            .iter()
            .find(|rule| rule.id == id)
            .cloned())
    }

    async fn find_tax_rule_by_apply_date(
        &self,
        apply_date: DateTime<Utc>,
    ) -> Result<Option<TaxRule>, RepositoryError> {
        Ok(self
            .tax_rules
            .read()
            .unwrap()
            .iter()
            .find(|rule| rule.apply_date == apply_date)
            .cloned())
    }

    async fn insert_tax_rule(&self, rule: NewTaxRule) -> Result<TaxRule, RepositoryError> {
        let mut rules = self.tax_rules.write().unwrap();
        let id = rules.iter().map(|rule| rule.id).max().unwrap_or(0) + 1;
        let now = Utc::now();
        let created = TaxRule {
            id,
            product_id: rule.product_id,
            product_class_id: rule.product_class_id,
            pref_id: rule.pref_id,
            country_id: rule.country_id,
            rounding_type: rule.rounding_type,
            tax_rate: rule.tax_rate,
            tax_adjust: rule.tax_adjust,
            apply_date: rule.apply_date,
            create_date: now,
            update_date: now,
        };
        rules.push(created.clone());
        Ok(created)
    }

    async fn update_tax_rule(&self, rule: &TaxRule) -> Result<(), RepositoryError> {
        let mut rules = self.tax_rules.write().unwrap();
        let stored = rules
            .iter_mut()
            .find(|stored| stored.id == rule.id)
            .ok_or(RepositoryError::NotFound)?;
        *stored = rule.clone();
        Ok(())
    }

    async fn remove_tax_rule(&self, id: i64) -> Result<(), RepositoryError> {
        let mut rules = self.tax_rules.write().unwrap();
        let before = rules.len();
        rules.retain(|rule| rule.id != id);
        if rules.len() == before {
            return Err(RepositoryError::NotFound);
        }
        self.removals.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn find_rounding_type(&self, id: i32) -> Result<Option<Master>, RepositoryError> {
        self.find_master(MasterKind::RoundingType, id).await
    }
}

#[async_trait]
impl ShipmentItemRepository for InMemoryStore {
    async fn find_shipment_item(&self, id: i64) -> Result<Option<ShipmentItem>, RepositoryError> {
        Ok(self.shipment_items.read().unwrap().get(&id).cloned())
    }

    async fn update_shipment_item(&self, item: &ShipmentItem) -> Result<(), RepositoryError> {
        let mut items = self.shipment_items.write().unwrap();
        match items.get_mut(&item.id) {
            Some(stored) => {
                *stored = item.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

#[async_trait]
impl ReferenceRepository for InMemoryStore {
    async fn find_master(
        &self,
        kind: MasterKind,
        id: i32,
    ) -> Result<Option<Master>, RepositoryError> {
        Ok(self.masters.read().unwrap().get(&(kind, id)).cloned())
    }

    async fn find_product(&self, id: i64) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products.read().unwrap().get(&id).cloned())
    }

    async fn find_product_class(&self, id: i64) -> Result<Option<ProductClass>, RepositoryError> {
        Ok(self.product_classes.read().unwrap().get(&id).cloned())
    }

    async fn find_order(&self, id: i64) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.read().unwrap().get(&id).cloned())
    }

    async fn find_shipping(&self, id: i64) -> Result<Option<Shipping>, RepositoryError> {
        Ok(self.shippings.read().unwrap().get(&id).cloned())
    }
}
