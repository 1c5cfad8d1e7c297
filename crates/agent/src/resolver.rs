use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use shopdesk_core::domain::inventory::{InventoryItem, StockLevel};
use shopdesk_core::domain::order::{Order, OrderId};
use shopdesk_db::repositories::{CommerceRepository, ProductCount};

use crate::intent::IntentTag;

pub const TOP_PRODUCTS_LIMIT: u32 = 5;

/// Structured facts for one message. Each consumer matches on every variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedData {
    TopProducts { entries: Vec<ProductCount> },
    OrderStatus(OrderSnapshot),
    Inventory(InventorySnapshot),
    NotFound { reason: String },
    Empty,
}

impl ResolvedData {
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::NotFound { reason: reason.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order_id: OrderId,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub item_count: u32,
}

impl From<Order> for OrderSnapshot {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.id,
            status: order.status,
            created_at: order.created_at,
            shipped_at: order.shipped_at,
            delivered_at: order.delivered_at,
            item_count: order.num_of_item,
        }
    }
}

/// Stock counts for the product name extracted from the message.
/// `available_items + sold_items == total_items` always holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub product_name: String,
    pub total_items: u64,
    pub available_items: u64,
    pub sold_items: u64,
}

impl InventorySnapshot {
    pub fn from_items(product_name: impl Into<String>, items: &[InventoryItem]) -> Self {
        let level = StockLevel::tally(items);
        Self {
            product_name: product_name.into(),
            total_items: level.total,
            available_items: level.available,
            sold_items: level.sold,
        }
    }
}

/// Runs the lookup that matches an intent. Lookups only read from the store.
#[derive(Clone)]
pub struct DataResolver {
    store: Arc<dyn CommerceRepository>,
}

impl DataResolver {
    pub fn new(store: Arc<dyn CommerceRepository>) -> Self {
        Self { store }
    }

    /// Never fails: extraction misses, lookup misses, and store errors all
    /// come back as [`ResolvedData::NotFound`].
    pub async fn resolve(&self, intent: IntentTag, message: &str) -> ResolvedData {
        match intent {
            IntentTag::TopProducts => self.top_products().await,
            IntentTag::OrderStatus => self.order_status(message).await,
            IntentTag::Inventory => self.inventory(message).await,
            IntentTag::Help | IntentTag::General => ResolvedData::Empty,
        }
    }

    async fn top_products(&self) -> ResolvedData {
        match self.store.top_products_by_count(TOP_PRODUCTS_LIMIT).await {
            Ok(entries) => ResolvedData::TopProducts { entries },
            Err(store_error) => {
                error!(
                    event_name = "agent.resolve.store_error",
                    intent = IntentTag::TopProducts.as_str(),
                    error = %store_error,
                    "top products lookup failed"
                );
                ResolvedData::not_found("top products are unavailable right now")
            }
        }
    }

    async fn order_status(&self, message: &str) -> ResolvedData {
        let Some(digits) = first_digit_run(message) else {
            return ResolvedData::not_found("no order id in message");
        };
        let Ok(raw_id) = digits.parse::<i64>() else {
            return ResolvedData::not_found(format!("order {digits} not found"));
        };

        let order_id = OrderId(raw_id);
        debug!(event_name = "agent.resolve.order_lookup", order_id = %order_id, "looking up order");
        match self.store.find_order(order_id).await {
            Ok(Some(order)) => ResolvedData::OrderStatus(order.into()),
            Ok(None) => ResolvedData::not_found(format!("order {order_id} not found")),
            Err(store_error) => {
                error!(
                    event_name = "agent.resolve.store_error",
                    intent = IntentTag::OrderStatus.as_str(),
                    order_id = %order_id,
                    error = %store_error,
                    "order lookup failed"
                );
                ResolvedData::not_found(format!("order {order_id} not found"))
            }
        }
    }

    async fn inventory(&self, message: &str) -> ResolvedData {
        let Some(product_name) = first_letter_run(message) else {
            return ResolvedData::not_found("no product name in message");
        };

        match self.store.find_inventory_by_product_name(product_name).await {
            Ok(items) if items.is_empty() => {
                ResolvedData::not_found(format!("no inventory for '{product_name}'"))
            }
            Ok(items) => ResolvedData::Inventory(InventorySnapshot::from_items(product_name, &items)),
            Err(store_error) => {
                error!(
                    event_name = "agent.resolve.store_error",
                    intent = IntentTag::Inventory.as_str(),
                    product_name,
                    error = %store_error,
                    "inventory lookup failed"
                );
                ResolvedData::not_found(format!("no inventory for '{product_name}'"))
            }
        }
    }
}

fn digit_run_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[0-9]+").expect("valid digit run pattern"))
}

fn letter_run_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[A-Za-z\s]+").expect("valid letter run pattern"))
}

/// First maximal run of ASCII digits anywhere in the message. Digits from
/// other scripts (`"order ٤٥٢١"`) are not recognised, unlike a Unicode `\d`
/// scan, so such messages resolve to "no order id".
pub fn first_digit_run(message: &str) -> Option<&str> {
    digit_run_pattern().find(message).map(|found| found.as_str())
}

/// First maximal run of ASCII letters and whitespace, trimmed. A run made only
/// of whitespace yields `""`, which matches every named inventory row. Filler
/// words are not stripped: for "is the red hoodie in stock" the whole sentence
/// becomes the name fragment.
pub fn first_letter_run(message: &str) -> Option<&str> {
    letter_run_pattern().find(message).map(|found| found.as_str().trim())
}
