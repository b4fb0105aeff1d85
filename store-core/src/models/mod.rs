mod catalog;
mod customer;
mod entity_ref;
mod master;
mod shipment_item;
mod tax_rule;

pub use catalog::{Country, Order, Pref, Product, ProductClass, Shipping};
pub use customer::Customer;
pub use entity_ref::{EntityRef, Identified};
pub use master::{Master, MasterKind};
pub use shipment_item::ShipmentItem;
pub use tax_rule::{NewTaxRule, ScopePresence, TaxRule};
