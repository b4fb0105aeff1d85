//! Tax amount calculation for a resolved [`TaxRule`].
//!
//! The rule's rounding type decides how the fractional yen of a tax amount
//! is dropped: rounding type `1` rounds half up, `2` rounds down and `3`
//! rounds up. Rules without a rounding type round half up.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{Master, TaxRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    HalfUp,
    Floor,
    Ceil,
}

impl Rounding {
    /// Maps a `mtb_rounding_type` row to a strategy. Unknown ids fall back
    /// to half up.
    pub fn from_master(master: Option<&Master>) -> Self {
        match master.map(|m| m.id) {
            Some(2) => Self::Floor,
            Some(3) => Self::Ceil,
            _ => Self::HalfUp,
        }
    }

    /// Rounds to whole currency units.
    pub fn apply(&self, value: Decimal) -> Decimal {
        let strategy = match self {
            Self::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            Self::Floor => RoundingStrategy::ToNegativeInfinity,
            Self::Ceil => RoundingStrategy::ToPositiveInfinity,
        };
        value.round_dp_with_strategy(0, strategy)
    }
}

/// Tax charged on `price` under `rule`, including the rule's adjustment.
///
/// ```
/// use chrono::Utc;
/// use rust_decimal_macros::dec;
/// use store_core::calculations::tax_amount;
/// use store_core::TaxRule;
///
/// let now = Utc::now();
/// let rule = TaxRule {
///     id: 1,
///     product_id: None,
///     product_class_id: None,
///     pref_id: None,
///     country_id: None,
///     rounding_type: None,
///     tax_rate: dec!(8),
///     tax_adjust: dec!(0),
///     apply_date: now,
///     create_date: now,
///     update_date: now,
/// };
///
/// assert_eq!(tax_amount(dec!(1050), &rule), dec!(84));
/// ```
pub fn tax_amount(price: Decimal, rule: &TaxRule) -> Decimal {
    let rounding = Rounding::from_master(rule.rounding_type.as_ref());
    rounding.apply(price * rule.tax_rate / Decimal::ONE_HUNDRED) + rule.tax_adjust
}

pub fn price_including_tax(price: Decimal, rule: &TaxRule) -> Decimal {
    price + tax_amount(price, rule)
}
