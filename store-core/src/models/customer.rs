use serde::{Deserialize, Serialize};

use super::catalog::{Country, Pref};

/// A logged-in storefront customer. Only the address fields the tax rule
/// lookup cares about are carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub email: String,
    pub pref: Option<Pref>,
    pub country: Option<Country>,
}
