use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use super::validation::{
    Constraint, FLOAT_INVALID_MESSAGE, FieldErrors, FormData, INVALID_MESSAGE, UNSIGNED_DECIMAL,
};
use crate::config::StoreConfig;
use crate::context::RequestContext;
use crate::db::repository::{ReferenceRepository, RepositoryError, ShipmentItemRepository};
use crate::models::{MasterKind, ShipmentItem};

/// How a field is rendered and parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Hidden,
    /// Whole currency units; `,` digit grouping is accepted.
    Money,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShipmentItemField {
    New,
    Id,
    Price,
    Quantity,
    TaxRate,
    ProductName,
    ProductCode,
    ClassName1,
    ClassName2,
    ClassCategoryName1,
    ClassCategoryName2,
    TaxRule,
    OrderItemType,
    TaxType,
    TaxDisplayType,
    Product,
    ProductClass,
    Order,
    Shipping,
}

impl ShipmentItemField {
    pub const ALL: [ShipmentItemField; 19] = [
        Self::New,
        Self::Id,
        Self::Price,
        Self::Quantity,
        Self::TaxRate,
        Self::ProductName,
        Self::ProductCode,
        Self::ClassName1,
        Self::ClassName2,
        Self::ClassCategoryName1,
        Self::ClassCategoryName2,
        Self::TaxRule,
        Self::OrderItemType,
        Self::TaxType,
        Self::TaxDisplayType,
        Self::Product,
        Self::ProductClass,
        Self::Order,
        Self::Shipping,
    ];

    /// Name of the field in submitted data.
    pub fn name(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Id => "id",
            Self::Price => "price",
            Self::Quantity => "quantity",
            Self::TaxRate => "tax_rate",
            Self::ProductName => "product_name",
            Self::ProductCode => "product_code",
            Self::ClassName1 => "class_name1",
            Self::ClassName2 => "class_name2",
            Self::ClassCategoryName1 => "class_category_name1",
            Self::ClassCategoryName2 => "class_category_name2",
            Self::TaxRule => "tax_rule",
            Self::OrderItemType => "order_item_type",
            Self::TaxType => "tax_type",
            Self::TaxDisplayType => "tax_display_type",
            Self::Product => "Product",
            Self::ProductClass => "ProductClass",
            Self::Order => "Order",
            Self::Shipping => "Shipping",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Price => FieldKind::Money,
            Self::Quantity | Self::TaxRate => FieldKind::Text,
            _ => FieldKind::Hidden,
        }
    }

    /// `new` and `id` only steer the submission; they are not written to
    /// the item.
    pub fn is_mapped(&self) -> bool {
        !matches!(self, Self::New | Self::Id)
    }

    pub fn constraints(&self, int_len: usize) -> Vec<Constraint> {
        match self {
            Self::Price | Self::Quantity => vec![
                Constraint::NotBlank,
                Constraint::Length { max: int_len },
            ],
            Self::TaxRate => vec![
                Constraint::NotBlank,
                Constraint::Length { max: int_len },
                Constraint::Pattern {
                    regex: &UNSIGNED_DECIMAL,
                    message: FLOAT_INVALID_MESSAGE,
                },
            ],
            _ => Vec::new(),
        }
    }
}

/// Ids of the relations that are set, keyed by the field that carries them.
fn relation_ids(item: &ShipmentItem) -> Vec<(ShipmentItemField, i64)> {
    [
        (ShipmentItemField::Order, item.order.as_ref().map(|o| o.id)),
        (ShipmentItemField::Product, item.product.as_ref().map(|p| p.id)),
        (
            ShipmentItemField::ProductClass,
            item.product_class.as_ref().map(|pc| pc.id),
        ),
        (ShipmentItemField::Shipping, item.shipping.as_ref().map(|s| s.id)),
        (
            ShipmentItemField::TaxType,
            item.tax_type.as_ref().map(|m| i64::from(m.id)),
        ),
        (
            ShipmentItemField::TaxDisplayType,
            item.tax_display_type.as_ref().map(|m| i64::from(m.id)),
        ),
        (
            ShipmentItemField::OrderItemType,
            item.order_item_type.as_ref().map(|m| i64::from(m.id)),
        ),
    ]
    .into_iter()
    .filter_map(|(field, id)| id.map(|id| (field, id)))
    .collect()
}

/// Strips `,` grouping and rounds to whole units. Blank stays blank.
fn normalize_money(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return Some(String::new());
    }
    raw.replace(',', "")
        .parse::<Decimal>()
        .ok()
        .map(|amount| {
            amount
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .normalize()
                .to_string()
        })
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Result of submitting a [`ShipmentItemForm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedShipmentItem {
    /// The item with every valid field applied. Fields with errors keep
    /// their previous value.
    pub item: ShipmentItem,
    pub errors: FieldErrors,
}

impl SubmittedShipmentItem {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Edit form for one shipment line in the admin order screen.
#[derive(Debug, Clone)]
pub struct ShipmentItemForm {
    int_len: usize,
}

impl ShipmentItemForm {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            int_len: config.int_len,
        }
    }

    pub fn block_prefix(&self) -> &'static str {
        "shipment_item"
    }

    pub fn fields(&self) -> &'static [ShipmentItemField] {
        &ShipmentItemField::ALL
    }

    pub fn constraints(&self, field: ShipmentItemField) -> Vec<Constraint> {
        field.constraints(self.int_len)
    }

    /// Values to render for `item`. Relations are shown as their ids and
    /// unset relations as empty strings.
    pub fn view_data(&self, item: &ShipmentItem) -> FormData {
        let mut data = item.scalar_values();
        if item.id == 0 {
            data.insert(ShipmentItemField::Id.name().to_string(), String::new());
        }
        data.insert(ShipmentItemField::New.name().to_string(), "1".to_string());

        for field in self.fields() {
            data.entry(field.name().to_string()).or_default();
        }
        for (field, id) in relation_ids(item) {
            data.insert(field.name().to_string(), id.to_string());
        }
        data
    }

    /// Backfills a modal submission of a new line from the stored item.
    ///
    /// Runs only when the request came from the modal and the payload
    /// carries `new`. Stored scalar values overwrite submitted ones; each
    /// relation is added as its id only when it is set.
    ///
    /// # Errors
    /// * [`RepositoryError::NotFound`] if `id` is missing or does not name a
    ///   stored item.
    pub async fn pre_submit<L>(
        &self,
        request: &dyn RequestContext,
        items: &L,
        data: &mut FormData,
    ) -> Result<(), RepositoryError>
    where
        L: ShipmentItemRepository + ?Sized,
    {
        if !request.is_modal() || !data.contains_key(ShipmentItemField::New.name()) {
            return Ok(());
        }

        let id = data
            .get(ShipmentItemField::Id.name())
            .and_then(|id| id.trim().parse::<i64>().ok())
            .ok_or(RepositoryError::NotFound)?;
        let stored = items
            .find_shipment_item(id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        data.extend(stored.scalar_values());
        for (field, relation_id) in relation_ids(&stored) {
            data.insert(field.name().to_string(), relation_id.to_string());
        }

        debug!(shipment_item_id = id, "backfilled modal shipment item submission");
        Ok(())
    }

    /// Validates `data` and binds it onto `item`.
    ///
    /// Validation problems are collected in
    /// [`SubmittedShipmentItem::errors`]; only repository failures are
    /// returned as `Err`.
    pub async fn submit<L>(
        &self,
        item: ShipmentItem,
        data: &FormData,
        lookup: &L,
    ) -> Result<SubmittedShipmentItem, RepositoryError>
    where
        L: ReferenceRepository + ?Sized,
    {
        let mut item = item;
        let mut errors = FieldErrors::new();

        for field in self.fields().iter().filter(|field| field.is_mapped()) {
            let raw = data.get(field.name()).map(|v| v.trim()).unwrap_or("");

            let value = match field.kind() {
                FieldKind::Money => match normalize_money(raw) {
                    Some(value) => value,
                    None => {
                        errors.add(field.name(), INVALID_MESSAGE);
                        continue;
                    }
                },
                FieldKind::Text | FieldKind::Hidden => raw.to_string(),
            };

            let violations: Vec<String> = self
                .constraints(*field)
                .iter()
                .filter_map(|constraint| constraint.check(&value))
                .collect();
            if !violations.is_empty() {
                for message in violations {
                    errors.add(field.name(), message);
                }
                continue;
            }

            if !bind(&mut item, *field, &value, lookup).await? {
                errors.add(field.name(), INVALID_MESSAGE);
            }
        }

        if !errors.is_empty() {
            debug!(
                shipment_item_id = item.id,
                fields = errors.len(),
                "shipment item submission has errors"
            );
        }
        Ok(SubmittedShipmentItem { item, errors })
    }

    /// [`pre_submit`](Self::pre_submit) followed by [`submit`](Self::submit).
    pub async fn handle_request<L>(
        &self,
        request: &dyn RequestContext,
        repository: &L,
        item: ShipmentItem,
        data: FormData,
    ) -> Result<SubmittedShipmentItem, RepositoryError>
    where
        L: ShipmentItemRepository + ReferenceRepository + ?Sized,
    {
        let mut data = data;
        self.pre_submit(request, repository, &mut data).await?;
        self.submit(item, &data, repository).await
    }
}

fn parse_id<T: std::str::FromStr>(value: &str) -> Option<T> {
    value.parse().ok()
}

/// Writes one validated value onto the item. Returns `false` when the value
/// cannot be converted, e.g. a reference id that does not exist.
async fn bind<L>(
    item: &mut ShipmentItem,
    field: ShipmentItemField,
    value: &str,
    lookup: &L,
) -> Result<bool, RepositoryError>
where
    L: ReferenceRepository + ?Sized,
{
    use ShipmentItemField as F;

    match field {
        F::New | F::Id => {}
        F::Price | F::Quantity | F::TaxRate => {
            let Ok(number) = value.parse::<Decimal>() else {
                return Ok(false);
            };
            match field {
                F::Price => item.price = number,
                F::Quantity => item.quantity = number,
                _ => item.tax_rate = number,
            }
        }
        F::ProductName => item.product_name = non_empty(value),
        F::ProductCode => item.product_code = non_empty(value),
        F::ClassName1 => item.class_name1 = non_empty(value),
        F::ClassName2 => item.class_name2 = non_empty(value),
        F::ClassCategoryName1 => item.class_category_name1 = non_empty(value),
        F::ClassCategoryName2 => item.class_category_name2 = non_empty(value),
        F::TaxRule => item.tax_rule = non_empty(value),
        F::OrderItemType | F::TaxType | F::TaxDisplayType => {
            let master = match value {
                "" => None,
                _ => {
                    let kind = match field {
                        F::OrderItemType => MasterKind::OrderItemType,
                        F::TaxType => MasterKind::TaxType,
                        _ => MasterKind::TaxDisplayType,
                    };
                    let Some(id) = parse_id(value) else {
                        return Ok(false);
                    };
                    match lookup.find_master(kind, id).await? {
                        Some(master) => Some(master),
                        None => return Ok(false),
                    }
                }
            };
            match field {
                F::OrderItemType => item.order_item_type = master,
                F::TaxType => item.tax_type = master,
                _ => item.tax_display_type = master,
            }
        }
        F::Product | F::ProductClass | F::Order | F::Shipping => {
            if value.is_empty() {
                match field {
                    F::Product => item.product = None,
                    F::ProductClass => item.product_class = None,
                    F::Order => item.order = None,
                    _ => item.shipping = None,
                }
                return Ok(true);
            }
            let Some(id) = parse_id::<i64>(value) else {
                return Ok(false);
            };
            let found = match field {
                F::Product => lookup.find_product(id).await?.map(|p| item.product = Some(p)),
                F::ProductClass => lookup
                    .find_product_class(id)
                    .await?
                    .map(|pc| item.product_class = Some(pc)),
                F::Order => lookup.find_order(id).await?.map(|o| item.order = Some(o)),
                _ => lookup.find_shipping(id).await?.map(|s| item.shipping = Some(s)),
            };
            return Ok(found.is_some());
        }
    }
    Ok(true)
}
