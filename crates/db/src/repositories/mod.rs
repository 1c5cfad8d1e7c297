use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use shopdesk_core::domain::conversation::{
    Conversation, ConversationId, ConversationTurn, Message, User, UserId,
};
use shopdesk_core::domain::inventory::InventoryItem;
use shopdesk_core::domain::order::{Order, OrderId};

pub mod commerce;
pub mod conversation;
pub mod memory;

pub use commerce::SqlCommerceRepository;
pub use conversation::SqlConversationRepository;
pub use memory::{InMemoryCommerceRepository, InMemoryConversationRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// A product name with the number of catalog rows carrying it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCount {
    pub name: String,
    pub count: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCounts {
    pub total: u64,
    pub from_user: u64,
    pub from_assistant: u64,
}

/// Read-only queries over the store's catalog, orders, and stock.
#[async_trait]
pub trait CommerceRepository: Send + Sync {
    /// Product names ranked by row count, highest first. Equal counts keep the
    /// order in which the name first appears in the catalog. Rows without a
    /// name are ignored.
    async fn top_products_by_count(&self, limit: u32)
        -> Result<Vec<ProductCount>, RepositoryError>;

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Inventory rows whose product name contains `fragment`, ignoring ASCII case.
    async fn find_inventory_by_product_name(
        &self,
        fragment: &str,
    ) -> Result<Vec<InventoryItem>, RepositoryError>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Looks up a user by email, creating one with the given names when absent.
    async fn get_or_create_user(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, RepositoryError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    async fn create_conversation(
        &self,
        user_id: &UserId,
        title: Option<&str>,
    ) -> Result<Conversation, RepositoryError>;

    async fn find_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError>;

    /// Active conversations for a user, most recently updated first.
    async fn list_active_conversations(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Conversation>, RepositoryError>;

    /// Appends a message and bumps the conversation's `updated_at`.
    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        content: &str,
        is_user_message: bool,
        metadata: Map<String, Value>,
    ) -> Result<Message, RepositoryError>;

    /// Messages newest first.
    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError>;

    /// The most recent `limit` turns, returned oldest first.
    async fn recent_history(
        &self,
        conversation_id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<ConversationTurn>, RepositoryError>;

    async fn message_counts(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<MessageCounts, RepositoryError>;

    async fn update_title(
        &self,
        conversation_id: &ConversationId,
        title: &str,
    ) -> Result<bool, RepositoryError>;

    async fn deactivate(&self, conversation_id: &ConversationId) -> Result<bool, RepositoryError>;
}

/// Current time at the precision timestamps are stored with.
pub(crate) fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub(crate) fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Accepts RFC 3339 as well as the naive `YYYY-MM-DD HH:MM:SS[.f]` form
/// (optionally suffixed with ` UTC`) found in dataset exports. Naive values are UTC.
pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    let trimmed = value.trim().trim_end_matches(" UTC");
    if let Ok(parsed) = DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        })
}

pub(crate) fn parse_optional_timestamp(
    column: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.map(|timestamp| parse_timestamp(column, &timestamp)).transpose()
}

pub(crate) fn parse_optional_decimal(
    column: &str,
    value: Option<String>,
) -> Result<Option<Decimal>, RepositoryError> {
    value
        .map(|raw| {
            raw.trim().parse::<Decimal>().map_err(|error| {
                RepositoryError::Decode(format!("invalid decimal in `{column}`: `{raw}` ({error})"))
            })
        })
        .transpose()
}
