use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use super::{run_pending, MIGRATOR};
    use crate::connect_with_settings;

    const MANAGED_SCHEMA_OBJECTS: &[&str] = &[
        "users",
        "conversations",
        "messages",
        "products",
        "orders",
        "inventory_items",
        "idx_conversations_user_id",
        "idx_messages_conversation_created",
        "idx_products_name",
        "idx_inventory_items_product_name",
    ];

    #[tokio::test]
    async fn migrations_create_managed_schema_objects() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        for name in MANAGED_SCHEMA_OBJECTS {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE name = ?1")
                    .bind(name)
                    .fetch_one(&pool)
                    .await
                    .expect("query sqlite_master");
            assert_eq!(count, 1, "expected schema object `{name}` after migrations");
        }

        pool.close().await;
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("first run");
        run_pending(&pool).await.expect("second run");

        let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
            .fetch_one(&pool)
            .await
            .expect("count applied migrations");
        assert_eq!(applied, MIGRATOR.iter().count() as i64);

        pool.close().await;
    }
}
