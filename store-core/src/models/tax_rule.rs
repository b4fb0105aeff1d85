use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::master::Master;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRule {
    pub id: i64,

    // Scope. A rule with every scope field unset is a global default.
    pub product_id: Option<i64>,
    pub product_class_id: Option<i64>,
    pub pref_id: Option<i32>,
    pub country_id: Option<i32>,

    pub rounding_type: Option<Master>,
    /// Percentage, e.g. `10` for 10%.
    pub tax_rate: Decimal,
    pub tax_adjust: Decimal,
    pub apply_date: DateTime<Utc>,

    pub create_date: DateTime<Utc>,
    pub update_date: DateTime<Utc>,
}

impl TaxRule {
    pub fn scope(&self) -> ScopePresence {
        ScopePresence {
            product: self.product_id.is_some_and(|id| id != 0),
            product_class: self.product_class_id.is_some_and(|id| id != 0),
            pref: self.pref_id.is_some_and(|id| id != 0),
            country: self.country_id.is_some_and(|id| id != 0),
        }
    }

    /// True when the rule is not tied to a product or product class.
    pub fn is_default(&self) -> bool {
        self.product_id.is_none() && self.product_class_id.is_none()
    }
}

/// For creating new rules (no id or timestamps)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTaxRule {
    pub product_id: Option<i64>,
    pub product_class_id: Option<i64>,
    pub pref_id: Option<i32>,
    pub country_id: Option<i32>,
    pub rounding_type: Option<Master>,
    pub tax_rate: Decimal,
    pub tax_adjust: Decimal,
    pub apply_date: DateTime<Utc>,
}

/// Which scope fields of a rule are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopePresence {
    pub product: bool,
    pub product_class: bool,
    pub pref: bool,
    pub country: bool,
}
