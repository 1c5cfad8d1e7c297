use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const DEMO_PRODUCT_IDS: &[i64] = &[9001, 9002, 9003, 9004, 9005, 9006, 9007, 9008];

const DEMO_ORDERS: &[(i64, &str)] = &[(4521, "Shipped"), (4522, "Complete"), (4523, "Processing")];

const DEMO_INVENTORY_IDS: &[i64] = &[70001, 70002, 70003, 70004, 70005];

/// Small, deterministic catalog for local demos and integration tests.
///
/// Contains three `Red Hoodie` catalog rows (two still in stock), an order in
/// each of the `Shipped`, `Complete`, and `Processing` states, and a handful of
/// sold and unsold inventory units.
pub struct DemoCatalogDataset;

impl DemoCatalogDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_catalog.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            products: DEMO_PRODUCT_IDS.len(),
            orders: DEMO_ORDERS.len(),
            inventory_items: DEMO_INVENTORY_IDS.len(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let products: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM products WHERE id IN {}",
            sql_array_from_ids(DEMO_PRODUCT_IDS)
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("products", products == DEMO_PRODUCT_IDS.len() as i64));

        for (order_id, status) in DEMO_ORDERS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM orders WHERE order_id = ?1 AND status = ?2)",
            )
            .bind(*order_id)
            .bind(*status)
            .fetch_one(pool)
            .await?;
            checks.push((order_label(*order_id), exists == 1));
        }

        let inventory: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM inventory_items WHERE id IN {}",
            sql_array_from_ids(DEMO_INVENTORY_IDS)
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("inventory-items", inventory == DEMO_INVENTORY_IDS.len() as i64));

        let hoodies_in_stock: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM inventory_items
             WHERE product_name = 'Red Hoodie' AND sold_at IS NULL",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("red-hoodie-in-stock", hoodies_in_stock == 2));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Remove the demo rows, leaving any other data untouched.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let order_ids: Vec<i64> = DEMO_ORDERS.iter().map(|(id, _)| *id).collect();
        sqlx::query(&format!(
            "DELETE FROM inventory_items WHERE id IN {}",
            sql_array_from_ids(DEMO_INVENTORY_IDS)
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!("DELETE FROM orders WHERE order_id IN {}", sql_array_from_ids(&order_ids)))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "DELETE FROM products WHERE id IN {}",
            sql_array_from_ids(DEMO_PRODUCT_IDS)
        ))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

fn order_label(order_id: i64) -> &'static str {
    match order_id {
        4521 => "order-4521-shipped",
        4522 => "order-4522-complete",
        _ => "order-4523-processing",
    }
}

fn sql_array_from_ids(ids: &[i64]) -> String {
    let joined = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
    format!("({joined})")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedResult {
    pub products: usize,
    pub orders: usize,
    pub inventory_items: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
