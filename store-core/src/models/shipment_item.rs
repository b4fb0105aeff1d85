use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::catalog::{Order, Product, ProductClass, Shipping};
use super::master::Master;

/// One line of a shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentItem {
    pub id: i64,

    pub price: Decimal,
    pub quantity: Decimal,
    pub tax_rate: Decimal,

    // Snapshot of the product at the time of the order
    pub product_name: Option<String>,
    pub product_code: Option<String>,
    pub class_name1: Option<String>,
    pub class_name2: Option<String>,
    pub class_category_name1: Option<String>,
    pub class_category_name2: Option<String>,
    pub tax_rule: Option<String>,

    pub order: Option<Order>,
    pub shipping: Option<Shipping>,
    pub product: Option<Product>,
    pub product_class: Option<ProductClass>,
    pub order_item_type: Option<Master>,
    pub tax_type: Option<Master>,
    pub tax_display_type: Option<Master>,
}

impl ShipmentItem {
    /// An empty line with zero amounts, used as the binding target for a
    /// line that has not been stored yet.
    pub fn blank() -> Self {
        Self {
            id: 0,
            price: Decimal::ZERO,
            quantity: Decimal::ZERO,
            tax_rate: Decimal::ZERO,
            product_name: None,
            product_code: None,
            class_name1: None,
            class_name2: None,
            class_category_name1: None,
            class_category_name2: None,
            tax_rule: None,
            order: None,
            shipping: None,
            product: None,
            product_class: None,
            order_item_type: None,
            tax_type: None,
            tax_display_type: None,
        }
    }

    /// Scalar columns as strings keyed by field name. Relations are not
    /// included; unset values become empty strings.
    pub fn scalar_values(&self) -> BTreeMap<String, String> {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();

        BTreeMap::from([
            ("id".to_string(), self.id.to_string()),
            ("price".to_string(), self.price.normalize().to_string()),
            ("quantity".to_string(), self.quantity.normalize().to_string()),
            ("tax_rate".to_string(), self.tax_rate.normalize().to_string()),
            ("product_name".to_string(), text(&self.product_name)),
            ("product_code".to_string(), text(&self.product_code)),
            ("class_name1".to_string(), text(&self.class_name1)),
            ("class_name2".to_string(), text(&self.class_name2)),
            ("class_category_name1".to_string(), text(&self.class_category_name1)),
            ("class_category_name2".to_string(), text(&self.class_category_name2)),
            ("tax_rule".to_string(), text(&self.tax_rule)),
        ])
    }
}
