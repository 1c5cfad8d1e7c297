use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub i64);

/// A catalog row from the e-commerce dataset. Most columns are nullable
/// upstream, so only the id is guaranteed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub department: Option<String>,
    pub sku: Option<String>,
    pub cost: Option<Decimal>,
    pub retail_price: Option<Decimal>,
}

impl Product {
    pub fn named(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: ProductId(id),
            name: Some(name.into()),
            category: None,
            brand: None,
            department: None,
            sku: None,
            cost: None,
            retail_price: None,
        }
    }
}
