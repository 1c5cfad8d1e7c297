use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use shopdesk_agent::{
    fallback_reply, CompletionRequest, GenerationError, GenerationSettings, IntentTag, LlmClient,
    ResolvedData, SupportAgent,
};
use shopdesk_core::domain::inventory::{InventoryItem, InventoryItemId};
use shopdesk_core::domain::order::{Order, OrderId};
use shopdesk_db::repositories::{
    CommerceRepository, InMemoryCommerceRepository, SqlCommerceRepository,
};
use shopdesk_db::{connect_with_settings, migrations, DemoCatalogDataset};

struct UnavailableModel;

#[async_trait]
impl LlmClient for UnavailableModel {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, GenerationError> {
        Err(GenerationError::Status { status: 503, body: "model overloaded".to_string() })
    }
}

fn offline_agent(store: Arc<dyn CommerceRepository>) -> SupportAgent {
    SupportAgent::with_client(store, Arc::new(UnavailableModel), GenerationSettings::default())
}

fn shipped_order() -> Order {
    Order {
        id: OrderId(4521),
        user_id: Some(310),
        status: "Shipped".to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 5, 2, 9, 15, 0).unwrap(),
        shipped_at: Some(Utc.with_ymd_and_hms(2024, 5, 3, 14, 40, 0).unwrap()),
        delivered_at: None,
        returned_at: None,
        num_of_item: 2,
    }
}

fn hoodie(id: i64, sold: bool) -> InventoryItem {
    InventoryItem {
        id: InventoryItemId(id),
        product_id: None,
        product_name: Some("Red Hoodie".to_string()),
        created_at: None,
        sold_at: sold.then(|| Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap()),
        cost: None,
    }
}

#[tokio::test]
async fn top_products_on_an_empty_store() {
    let agent = offline_agent(Arc::new(InMemoryCommerceRepository::default()));

    let reply = agent.reply("What are the top products?", &[]).await;

    assert_eq!(reply.intent, IntentTag::TopProducts);
    assert_eq!(reply.data, ResolvedData::TopProducts { entries: vec![] });
    assert_eq!(
        reply.text,
        "I can help you find information about our top selling products. Please try asking again."
    );
}

#[tokio::test]
async fn status_of_a_shipped_order() {
    let store = InMemoryCommerceRepository::default().with_orders([shipped_order()]);
    let agent = offline_agent(Arc::new(store));

    let reply = agent.reply("status of order 4521", &[]).await;

    assert_eq!(reply.intent, IntentTag::OrderStatus);
    let ResolvedData::OrderStatus(snapshot) = &reply.data else {
        panic!("expected order data, got {:?}", reply.data);
    };
    assert_eq!(snapshot.order_id, OrderId(4521));
    assert!(reply.text.contains("Order ID 4521 status: Shipped"));
}

#[tokio::test]
async fn red_hoodie_stock_splits_available_and_sold() {
    let store = InMemoryCommerceRepository::default().with_inventory([
        hoodie(1, true),
        hoodie(2, false),
        hoodie(3, false),
    ]);
    let agent = offline_agent(Arc::new(store));

    let reply = agent.reply("red hoodie: still in stock?", &[]).await;

    assert_eq!(reply.intent, IntentTag::Inventory);
    let ResolvedData::Inventory(stock) = &reply.data else {
        panic!("expected inventory data, got {:?}", reply.data);
    };
    assert_eq!(stock.product_name, "red hoodie");
    assert_eq!((stock.total_items, stock.available_items, stock.sold_items), (3, 2, 1));
    assert_eq!(stock.available_items + stock.sold_items, stock.total_items);
}

#[tokio::test]
async fn leading_filler_words_stay_in_the_product_fragment() {
    let store = InMemoryCommerceRepository::default().with_inventory([hoodie(1, false)]);
    let agent = offline_agent(Arc::new(store));

    let reply = agent.reply("is the red hoodie in stock", &[]).await;

    assert_eq!(reply.intent, IntentTag::Inventory);
    assert_eq!(reply.data, ResolvedData::not_found("no inventory for 'is the red hoodie in stock'"));
    assert_eq!(reply.text, "I can help you check inventory levels. Please specify a product name.");
}

#[tokio::test]
async fn failed_generation_returns_the_deterministic_fallback() {
    let store = InMemoryCommerceRepository::default().with_orders([shipped_order()]);
    let agent = offline_agent(Arc::new(store));

    for message in ["status of order 4521", "help", "good morning", "order please"] {
        let reply = agent.reply(message, &[]).await;
        assert!(reply.used_fallback, "{message}");
        assert_eq!(reply.text, fallback_reply(reply.intent, &reply.data), "{message}");
    }
}

#[tokio::test]
async fn demo_catalog_answers_through_the_sql_store() {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    DemoCatalogDataset::load(&pool).await.expect("seed");
    let agent = offline_agent(Arc::new(SqlCommerceRepository::new(pool.clone())));

    let top = agent.reply("What are your best sellers?", &[]).await;
    assert!(top.text.starts_with("Here are the top 5 most sold products:\n1. Red Hoodie: 3 units sold\n"));

    let order = agent.reply("tracking 4521", &[]).await;
    assert_eq!(
        order.text,
        "Order ID 4521 status: Shipped\nCreated: 2024-05-02 09:15:00\nItems: 2\nShipped: 2024-05-03 14:40:00\n"
    );

    let stock = agent.reply("Red Hoodie, how many left?", &[]).await;
    assert_eq!(
        stock.text,
        "Inventory status for Red Hoodie:\nAvailable in stock: 2 items\nTotal items: 3\nSold items: 1\n"
    );

    pool.close().await;
}
