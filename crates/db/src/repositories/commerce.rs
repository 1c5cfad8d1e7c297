use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use shopdesk_core::domain::inventory::{InventoryItem, InventoryItemId};
use shopdesk_core::domain::order::{Order, OrderId};
use shopdesk_core::domain::product::{Product, ProductId};

use super::{
    format_timestamp, parse_optional_decimal, parse_optional_timestamp, parse_timestamp,
    CommerceRepository, ProductCount, RepositoryError,
};
use crate::DbPool;

pub struct SqlCommerceRepository {
    pool: DbPool,
}

impl SqlCommerceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn insert_product(&self, product: &Product) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT OR REPLACE INTO products (
                id, cost, category, name, brand, retail_price, department, sku
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(product.id.0)
        .bind(product.cost.map(|value| value.to_string()))
        .bind(product.category.as_deref())
        .bind(product.name.as_deref())
        .bind(product.brand.as_deref())
        .bind(product.retail_price.map(|value| value.to_string()))
        .bind(product.department.as_deref())
        .bind(product.sku.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_order(&self, order: &Order) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT OR REPLACE INTO orders (
                order_id, user_id, status, created_at, returned_at, shipped_at, delivered_at,
                num_of_item
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(order.id.0)
        .bind(order.user_id)
        .bind(&order.status)
        .bind(format_timestamp(&order.created_at))
        .bind(order.returned_at.as_ref().map(format_timestamp))
        .bind(order.shipped_at.as_ref().map(format_timestamp))
        .bind(order.delivered_at.as_ref().map(format_timestamp))
        .bind(i64::from(order.num_of_item))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_inventory_item(&self, item: &InventoryItem) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT OR REPLACE INTO inventory_items (
                id, product_id, created_at, sold_at, cost, product_name
             ) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(item.id.0)
        .bind(item.product_id.map(|id| id.0))
        .bind(item.created_at.as_ref().map(format_timestamp))
        .bind(item.sold_at.as_ref().map(format_timestamp))
        .bind(item.cost.map(|value| value.to_string()))
        .bind(item.product_name.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl CommerceRepository for SqlCommerceRepository {
    async fn top_products_by_count(
        &self,
        limit: u32,
    ) -> Result<Vec<ProductCount>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT name, COUNT(*) AS product_count
             FROM products
             WHERE name IS NOT NULL
             GROUP BY name
             ORDER BY product_count DESC, MIN(id) ASC
             LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let count: i64 = row.try_get("product_count")?;
                Ok::<_, RepositoryError>(ProductCount {
                    name: row.try_get("name")?,
                    count: u64::try_from(count).map_err(|_| {
                        RepositoryError::Decode(format!("negative product count {count}"))
                    })?,
                })
            })
            .collect()
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(
            "SELECT order_id, user_id, status, created_at, returned_at, shipped_at, delivered_at,
                    num_of_item
             FROM orders
             WHERE order_id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(order_from_row).transpose()
    }

    async fn find_inventory_by_product_name(
        &self,
        fragment: &str,
    ) -> Result<Vec<InventoryItem>, RepositoryError> {
        let pattern = format!("%{}%", escape_like(fragment));
        let rows = sqlx::query(
            "SELECT id, product_id, created_at, sold_at, cost, product_name
             FROM inventory_items
             WHERE product_name LIKE ? ESCAPE '\\'
             ORDER BY id ASC",
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(inventory_from_row).collect()
    }
}

fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for ch in fragment.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn order_from_row(row: SqliteRow) -> Result<Order, RepositoryError> {
    let created_at: String = row.try_get("created_at")?;
    let num_of_item: i64 = row.try_get("num_of_item")?;

    Ok(Order {
        id: OrderId(row.try_get("order_id")?),
        user_id: row.try_get("user_id")?,
        status: row.try_get("status")?,
        created_at: parse_timestamp("created_at", &created_at)?,
        shipped_at: parse_optional_timestamp("shipped_at", row.try_get("shipped_at")?)?,
        delivered_at: parse_optional_timestamp("delivered_at", row.try_get("delivered_at")?)?,
        returned_at: parse_optional_timestamp("returned_at", row.try_get("returned_at")?)?,
        num_of_item: u32::try_from(num_of_item).map_err(|_| {
            RepositoryError::Decode(format!(
                "invalid value for `num_of_item` (expected non-negative u32): {num_of_item}"
            ))
        })?,
    })
}

fn inventory_from_row(row: SqliteRow) -> Result<InventoryItem, RepositoryError> {
    Ok(InventoryItem {
        id: InventoryItemId(row.try_get("id")?),
        product_id: row.try_get::<Option<i64>, _>("product_id")?.map(ProductId),
        product_name: row.try_get("product_name")?,
        created_at: parse_optional_timestamp("created_at", row.try_get("created_at")?)?,
        sold_at: parse_optional_timestamp("sold_at", row.try_get("sold_at")?)?,
        cost: parse_optional_decimal("cost", row.try_get("cost")?)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use shopdesk_core::domain::inventory::{InventoryItem, InventoryItemId, StockLevel};
    use shopdesk_core::domain::order::{Order, OrderId};
    use shopdesk_core::domain::product::Product;

    use super::{escape_like, SqlCommerceRepository};
    use crate::migrations;
    use crate::repositories::{CommerceRepository, ProductCount};
    use crate::{connect_with_settings, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn stock(id: i64, name: &str, sold: bool) -> InventoryItem {
        InventoryItem {
            id: InventoryItemId(id),
            product_id: None,
            product_name: Some(name.to_string()),
            created_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()),
            sold_at: sold.then(|| Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap()),
            cost: Some(Decimal::new(1820, 2)),
        }
    }

    #[tokio::test]
    async fn top_products_rank_by_count_then_first_appearance() {
        let pool = setup_pool().await;
        let repo = SqlCommerceRepository::new(pool.clone());
        for (id, name) in
            [(1, "Beanie"), (2, "Hoodie"), (3, "Tee"), (4, "Hoodie"), (5, "Tee"), (6, "Scarf")]
        {
            repo.insert_product(&Product::named(id, name)).await.expect("insert product");
        }
        let mut nameless = Product::named(7, "ignored");
        nameless.name = None;
        repo.insert_product(&nameless).await.expect("insert nameless");

        let top = repo.top_products_by_count(3).await.expect("top products");

        assert_eq!(
            top,
            vec![
                ProductCount { name: "Hoodie".to_string(), count: 2 },
                ProductCount { name: "Tee".to_string(), count: 2 },
                ProductCount { name: "Beanie".to_string(), count: 1 },
            ]
        );

        pool.close().await;
    }

    #[tokio::test]
    async fn top_products_on_empty_catalog_is_empty() {
        let pool = setup_pool().await;
        let repo = SqlCommerceRepository::new(pool.clone());

        assert!(repo.top_products_by_count(5).await.expect("top products").is_empty());

        pool.close().await;
    }

    #[tokio::test]
    async fn order_round_trip_keeps_optional_timestamps() {
        let pool = setup_pool().await;
        let repo = SqlCommerceRepository::new(pool.clone());
        let order = Order {
            id: OrderId(4521),
            user_id: Some(310),
            status: "Shipped".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 2, 9, 15, 0).unwrap(),
            shipped_at: Some(Utc.with_ymd_and_hms(2024, 5, 3, 14, 40, 0).unwrap()),
            delivered_at: None,
            returned_at: None,
            num_of_item: 2,
        };
        repo.insert_order(&order).await.expect("insert order");

        assert_eq!(repo.find_order(OrderId(4521)).await.expect("find"), Some(order));
        assert_eq!(repo.find_order(OrderId(99999)).await.expect("find missing"), None);

        pool.close().await;
    }

    #[tokio::test]
    async fn inventory_lookup_is_case_insensitive_substring() {
        let pool = setup_pool().await;
        let repo = SqlCommerceRepository::new(pool.clone());
        repo.insert_inventory_item(&stock(1, "Red Hoodie", true)).await.expect("insert");
        repo.insert_inventory_item(&stock(2, "Red Hoodie", false)).await.expect("insert");
        repo.insert_inventory_item(&stock(3, "Blue Hoodie", false)).await.expect("insert");
        repo.insert_inventory_item(&stock(4, "Wool Beanie", false)).await.expect("insert");

        let items = repo.find_inventory_by_product_name("red hoodie").await.expect("lookup");
        assert_eq!(items.len(), 2);
        assert_eq!(StockLevel::tally(&items), StockLevel { total: 2, available: 1, sold: 1 });

        let hoodies = repo.find_inventory_by_product_name("HOODIE").await.expect("lookup");
        assert_eq!(hoodies.len(), 3);

        assert!(repo.find_inventory_by_product_name("kayak").await.expect("lookup").is_empty());

        pool.close().await;
    }

    #[tokio::test]
    async fn inventory_lookup_treats_wildcards_literally() {
        let pool = setup_pool().await;
        let repo = SqlCommerceRepository::new(pool.clone());
        repo.insert_inventory_item(&stock(1, "Red Hoodie", false)).await.expect("insert");
        repo.insert_inventory_item(&stock(2, "100% Wool Scarf", false)).await.expect("insert");

        assert_eq!(repo.find_inventory_by_product_name("%").await.expect("lookup").len(), 1);
        assert!(repo.find_inventory_by_product_name("R_d").await.expect("lookup").is_empty());

        pool.close().await;
    }

    #[tokio::test]
    async fn empty_fragment_matches_every_named_row() {
        let pool = setup_pool().await;
        let repo = SqlCommerceRepository::new(pool.clone());
        repo.insert_inventory_item(&stock(1, "Red Hoodie", false)).await.expect("insert");
        repo.insert_inventory_item(&stock(2, "Wool Beanie", true)).await.expect("insert");
        let mut unnamed = stock(3, "ignored", false);
        unnamed.product_name = None;
        repo.insert_inventory_item(&unnamed).await.expect("insert");

        let ids: Vec<i64> = repo
            .find_inventory_by_product_name("")
            .await
            .expect("lookup")
            .into_iter()
            .map(|item| item.id.0)
            .collect();

        assert_eq!(ids, vec![1, 2]);

        pool.close().await;
    }

    #[test]
    fn escape_like_prefixes_wildcards() {
        assert_eq!(escape_like(r"50%_off\"), r"50\%\_off\\");
        assert_eq!(escape_like("red hoodie"), "red hoodie");
    }
}
