use shopdesk_core::domain::inventory::StockLevel;
use shopdesk_core::domain::order::OrderId;
use shopdesk_db::repositories::{CommerceRepository, ProductCount, SqlCommerceRepository};
use shopdesk_db::{connect_with_settings, migrations, DbPool, DemoCatalogDataset};

async fn seeded_pool() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    DemoCatalogDataset::load(&pool).await.expect("seed");
    pool
}

#[tokio::test]
async fn demo_catalog_ranks_red_hoodie_first() {
    let pool = seeded_pool().await;
    let repo = SqlCommerceRepository::new(pool.clone());

    let top = repo.top_products_by_count(5).await.expect("top products");

    assert_eq!(top.len(), 5);
    assert_eq!(top[0], ProductCount { name: "Red Hoodie".to_string(), count: 3 });
    assert_eq!(top[1], ProductCount { name: "Classic Crew Tee".to_string(), count: 2 });
    let singles: Vec<_> = top[2..].iter().map(|entry| entry.name.as_str()).collect();
    assert_eq!(singles, vec!["Slim Selvedge Jeans", "Wool Beanie", "Rain Shell Jacket"]);

    pool.close().await;
}

#[tokio::test]
async fn demo_catalog_serves_order_and_stock_lookups() {
    let pool = seeded_pool().await;
    let repo = SqlCommerceRepository::new(pool.clone());

    let order = repo.find_order(OrderId(4521)).await.expect("find").expect("order exists");
    assert_eq!(order.status, "Shipped");
    assert_eq!(order.num_of_item, 2);
    assert!(order.shipped_at.is_some());
    assert!(order.delivered_at.is_none());

    let hoodies = repo.find_inventory_by_product_name("red hoodie").await.expect("inventory");
    assert_eq!(StockLevel::tally(&hoodies), StockLevel { total: 3, available: 2, sold: 1 });

    pool.close().await;
}
