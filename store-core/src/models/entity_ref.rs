use super::catalog::{Country, Order, Pref, Product, ProductClass, Shipping};
use super::tax_rule::TaxRule;

/// Anything stored with a numeric primary key.
pub trait Identified {
    fn id(&self) -> i64;
}

/// An argument that may be given either as a bare id or as the loaded
/// entity. Callers normalize it with [`EntityRef::id`] before use.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityRef<T> {
    Id(i64),
    Entity(T),
}

impl<T: Identified> EntityRef<T> {
    pub fn id(&self) -> i64 {
        match self {
            Self::Id(id) => *id,
            Self::Entity(entity) => entity.id(),
        }
    }
}

impl<T> From<i64> for EntityRef<T> {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

macro_rules! identified {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identified for $ty {
                fn id(&self) -> i64 {
                    i64::from(self.id)
                }
            }

            impl From<$ty> for EntityRef<$ty> {
                fn from(entity: $ty) -> Self {
                    Self::Entity(entity)
                }
            }
        )*
    };
}

identified!(Product, ProductClass, Order, Shipping, Pref, Country, TaxRule);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_variant_returns_the_id() {
        let product: EntityRef<Product> = EntityRef::Id(7);
        assert_eq!(product.id(), 7);
    }

    #[test]
    fn entity_variant_returns_the_entity_id() {
        let pref: EntityRef<Pref> = Pref {
            id: 13,
            name: "Tokyo".to_string(),
        }
        .into();
        assert_eq!(pref.id(), 13);
    }

    #[test]
    fn bare_ids_convert_to_the_id_variant() {
        let country: EntityRef<Country> = 392.into();
        assert!(matches!(country, EntityRef::Id(392)));
    }
}
