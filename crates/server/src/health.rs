use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use shopdesk_db::DbPool;
use tracing::warn;

/// Liveness of the chat service. `Unhealthy` means the store cannot answer a
/// trivial query, so chat replies would fail to persist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Liveness {
    Healthy,
    Unhealthy,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: Liveness,
    pub timestamp: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(db_pool)
}

pub async fn health(State(pool): State<DbPool>) -> (StatusCode, Json<HealthStatus>) {
    let status = match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => Liveness::Healthy,
        Err(error) => {
            warn!(
                event_name = "server.health.store_unreachable",
                correlation_id = "health",
                error = %error,
                "store did not answer the health query"
            );
            Liveness::Unhealthy
        }
    };

    let code = match status {
        Liveness::Healthy => StatusCode::OK,
        Liveness::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(HealthStatus { status, timestamp: Utc::now().to_rfc3339() }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use chrono::DateTime;
    use shopdesk_db::connect_with_settings;
    use tower::ServiceExt;

    use super::{router, HealthStatus, Liveness};

    async fn fetch_health(pool: shopdesk_db::DbPool) -> (StatusCode, HealthStatus) {
        let response = router(pool)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("health json"))
    }

    #[tokio::test]
    async fn reachable_store_reports_healthy_with_timestamp() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");

        let (code, body) = fetch_health(pool.clone()).await;

        assert_eq!(code, StatusCode::OK);
        assert_eq!(body.status, Liveness::Healthy);
        assert!(DateTime::parse_from_rfc3339(&body.timestamp).is_ok());

        pool.close().await;
    }

    #[tokio::test]
    async fn closed_store_reports_unhealthy() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        pool.close().await;

        let (code, body) = fetch_health(pool).await;

        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, Liveness::Unhealthy);
    }

    #[test]
    fn body_has_exactly_status_and_timestamp() {
        let body = HealthStatus { status: Liveness::Healthy, timestamp: "t".to_string() };

        assert_eq!(
            serde_json::to_value(body).expect("json"),
            serde_json::json!({"status": "healthy", "timestamp": "t"})
        );
    }
}
