//! Admin-side form binding.
//!
//! Submitted data arrives as a flat string map ([`FormData`]). Forms
//! validate it field by field, collecting messages in [`FieldErrors`]
//! instead of failing, and bind what is valid onto the target entity.

pub mod shipment_item;
pub mod validation;

pub use shipment_item::{FieldKind, ShipmentItemField, ShipmentItemForm, SubmittedShipmentItem};
pub use validation::{Constraint, FieldErrors, FormData};
