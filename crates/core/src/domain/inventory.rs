use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InventoryItemId(pub i64);

/// One physical unit of stock. A unit is available until `sold_at` is set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: InventoryItemId,
    pub product_id: Option<ProductId>,
    pub product_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub sold_at: Option<DateTime<Utc>>,
    pub cost: Option<Decimal>,
}

impl InventoryItem {
    pub fn is_available(&self) -> bool {
        self.sold_at.is_none()
    }
}

/// Unit counts for a set of inventory rows.
///
/// `available + sold == total` holds for every value produced by [`StockLevel::tally`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub total: u64,
    pub available: u64,
    pub sold: u64,
}

impl StockLevel {
    pub fn tally<'a>(items: impl IntoIterator<Item = &'a InventoryItem>) -> Self {
        let (total, available) = items.into_iter().fold((0u64, 0u64), |(total, available), item| {
            (total + 1, available + u64::from(item.is_available()))
        });
        Self { total, available, sold: total - available }
    }
}
