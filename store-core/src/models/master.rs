use serde::{Deserialize, Serialize};

/// The `mtb_*` lookup tables a shipment item or tax rule can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MasterKind {
    OrderItemType,
    TaxType,
    TaxDisplayType,
    RoundingType,
}

impl MasterKind {
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::OrderItemType => "mtb_order_item_type",
            Self::TaxType => "mtb_tax_type",
            Self::TaxDisplayType => "mtb_tax_display_type",
            Self::RoundingType => "mtb_rounding_type",
        }
    }
}

/// A row of one of the master lookup tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Master {
    pub id: i32,
    pub name: String,
    pub sort_no: i32,
}
