use std::collections::HashMap;

use serde_json::{Map, Value};
use tokio::sync::RwLock;

use shopdesk_core::domain::conversation::{
    Conversation, ConversationId, ConversationTurn, Message, MessageId, User, UserId,
};
use shopdesk_core::domain::inventory::InventoryItem;
use shopdesk_core::domain::order::{Order, OrderId};
use shopdesk_core::domain::product::Product;

use super::{
    now_micros, CommerceRepository, ConversationRepository, MessageCounts, ProductCount,
    RepositoryError,
};

/// Catalog, orders, and stock held in memory. Products keep insertion order so
/// ranking ties resolve the same way the SQL store resolves them.
#[derive(Default)]
pub struct InMemoryCommerceRepository {
    products: RwLock<Vec<Product>>,
    orders: RwLock<HashMap<OrderId, Order>>,
    inventory: RwLock<Vec<InventoryItem>>,
}

impl InMemoryCommerceRepository {
    pub fn with_products(mut self, products: impl IntoIterator<Item = Product>) -> Self {
        self.products.get_mut().extend(products);
        self
    }

    pub fn with_orders(mut self, orders: impl IntoIterator<Item = Order>) -> Self {
        self.orders.get_mut().extend(orders.into_iter().map(|order| (order.id, order)));
        self
    }

    pub fn with_inventory(mut self, items: impl IntoIterator<Item = InventoryItem>) -> Self {
        self.inventory.get_mut().extend(items);
        self
    }
}

#[async_trait::async_trait]
impl CommerceRepository for InMemoryCommerceRepository {
    async fn top_products_by_count(
        &self,
        limit: u32,
    ) -> Result<Vec<ProductCount>, RepositoryError> {
        let products = self.products.read().await;
        let mut ranked: Vec<ProductCount> = Vec::new();
        for name in products.iter().filter_map(|product| product.name.as_deref()) {
            match ranked.iter_mut().find(|entry| entry.name == name) {
                Some(entry) => entry.count += 1,
                None => ranked.push(ProductCount { name: name.to_owned(), count: 1 }),
            }
        }
        // stable: equal counts keep first-appearance order
        ranked.sort_by(|left, right| right.count.cmp(&left.count));
        ranked.truncate(limit as usize);
        Ok(ranked)
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id).cloned())
    }

    async fn find_inventory_by_product_name(
        &self,
        fragment: &str,
    ) -> Result<Vec<InventoryItem>, RepositoryError> {
        let needle = fragment.to_ascii_lowercase();
        let inventory = self.inventory.read().await;
        let mut matches: Vec<InventoryItem> = inventory
            .iter()
            .filter(|item| {
                item.product_name
                    .as_deref()
                    .is_some_and(|name| name.to_ascii_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        matches.sort_by_key(|item| item.id);
        Ok(matches)
    }
}

#[derive(Default)]
pub struct InMemoryConversationRepository {
    users: RwLock<HashMap<String, User>>,
    conversations: RwLock<HashMap<ConversationId, Conversation>>,
    messages: RwLock<Vec<Message>>,
}

#[async_trait::async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn get_or_create_user(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        let user = users.entry(email.to_owned()).or_insert_with(|| User {
            id: UserId::generate(),
            email: email.to_owned(),
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
            created_at: now_micros(),
        });
        Ok(user.clone())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.get(email).cloned())
    }

    async fn create_conversation(
        &self,
        user_id: &UserId,
        title: Option<&str>,
    ) -> Result<Conversation, RepositoryError> {
        let now = now_micros();
        let conversation = Conversation {
            id: ConversationId::generate(),
            user_id: *user_id,
            title: title.map(str::to_owned).unwrap_or_else(|| Conversation::default_title(now)),
            created_at: now,
            updated_at: None,
            is_active: true,
        };
        let mut conversations = self.conversations.write().await;
        conversations.insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn find_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let conversations = self.conversations.read().await;
        Ok(conversations.get(id).cloned())
    }

    async fn list_active_conversations(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let conversations = self.conversations.read().await;
        let mut active: Vec<Conversation> = conversations
            .values()
            .filter(|conversation| conversation.is_active && conversation.is_owned_by(user_id))
            .cloned()
            .collect();
        active.sort_by(|left, right| {
            let left_at = left.updated_at.unwrap_or(left.created_at);
            let right_at = right.updated_at.unwrap_or(right.created_at);
            right_at.cmp(&left_at)
        });
        Ok(active)
    }

    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        content: &str,
        is_user_message: bool,
        metadata: Map<String, Value>,
    ) -> Result<Message, RepositoryError> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations.get_mut(conversation_id).ok_or_else(|| {
            RepositoryError::Decode(format!("conversation {conversation_id} does not exist"))
        })?;

        let message = Message {
            id: MessageId::generate(),
            conversation_id: *conversation_id,
            content: content.to_owned(),
            is_user_message,
            created_at: now_micros(),
            metadata,
        };
        conversation.updated_at = Some(message.created_at);
        self.messages.write().await.push(message.clone());
        Ok(message)
    }

    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        let messages = self.messages.read().await;
        Ok(messages
            .iter()
            .rev()
            .filter(|message| &message.conversation_id == conversation_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn recent_history(
        &self,
        conversation_id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<ConversationTurn>, RepositoryError> {
        let mut newest_first = self.list_messages(conversation_id, limit).await?;
        newest_first.reverse();
        Ok(newest_first.into_iter().map(ConversationTurn::from).collect())
    }

    async fn message_counts(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<MessageCounts, RepositoryError> {
        let messages = self.messages.read().await;
        Ok(messages.iter().filter(|message| &message.conversation_id == conversation_id).fold(
            MessageCounts::default(),
            |mut counts, message| {
                counts.total += 1;
                if message.is_user_message {
                    counts.from_user += 1;
                } else {
                    counts.from_assistant += 1;
                }
                counts
            },
        ))
    }

    async fn update_title(
        &self,
        conversation_id: &ConversationId,
        title: &str,
    ) -> Result<bool, RepositoryError> {
        let mut conversations = self.conversations.write().await;
        Ok(match conversations.get_mut(conversation_id) {
            Some(conversation) => {
                conversation.title = title.to_owned();
                conversation.updated_at = Some(now_micros());
                true
            }
            None => false,
        })
    }

    async fn deactivate(&self, conversation_id: &ConversationId) -> Result<bool, RepositoryError> {
        let mut conversations = self.conversations.write().await;
        Ok(match conversations.get_mut(conversation_id) {
            Some(conversation) => {
                conversation.is_active = false;
                true
            }
            None => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::Map;

    use shopdesk_core::domain::inventory::{InventoryItem, InventoryItemId};
    use shopdesk_core::domain::order::{Order, OrderId};
    use shopdesk_core::domain::product::Product;

    use crate::repositories::{
        CommerceRepository, ConversationRepository, InMemoryCommerceRepository,
        InMemoryConversationRepository, ProductCount,
    };

    fn item(id: i64, name: Option<&str>) -> InventoryItem {
        InventoryItem {
            id: InventoryItemId(id),
            product_id: None,
            product_name: name.map(str::to_string),
            created_at: None,
            sold_at: None,
            cost: None,
        }
    }

    #[tokio::test]
    async fn in_memory_top_products_match_sql_tie_break() {
        let repo = InMemoryCommerceRepository::default().with_products([
            Product::named(1, "Beanie"),
            Product::named(2, "Hoodie"),
            Product::named(3, "Tee"),
            Product::named(4, "Tee"),
            Product::named(5, "Hoodie"),
        ]);

        let top = repo.top_products_by_count(2).await.expect("top");

        assert_eq!(
            top,
            vec![
                ProductCount { name: "Hoodie".to_string(), count: 2 },
                ProductCount { name: "Tee".to_string(), count: 2 },
            ]
        );
        assert!(repo.top_products_by_count(0).await.expect("top").is_empty());
    }

    #[tokio::test]
    async fn in_memory_order_and_inventory_lookups() {
        let order = Order {
            id: OrderId(7),
            user_id: None,
            status: "Processing".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            shipped_at: None,
            delivered_at: None,
            returned_at: None,
            num_of_item: 1,
        };
        let repo = InMemoryCommerceRepository::default()
            .with_orders([order.clone()])
            .with_inventory([item(3, Some("Red Hoodie")), item(1, Some("RED hoodie")), item(2, None)]);

        assert_eq!(repo.find_order(OrderId(7)).await.expect("find"), Some(order));
        assert_eq!(repo.find_order(OrderId(8)).await.expect("find"), None);

        let ids: Vec<i64> = repo
            .find_inventory_by_product_name("red HOODIE")
            .await
            .expect("lookup")
            .into_iter()
            .map(|item| item.id.0)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn in_memory_conversations_follow_store_contract() {
        let repo = InMemoryConversationRepository::default();
        let user = repo.get_or_create_user("a@example.com", "A", "B").await.expect("user");
        let again = repo.get_or_create_user("a@example.com", "X", "Y").await.expect("user");
        assert_eq!(user, again);

        let conversation = repo.create_conversation(&user.id, None).await.expect("conversation");
        for content in ["one", "two", "three"] {
            repo.append_message(&conversation.id, content, true, Map::new()).await.expect("append");
        }

        let history = repo.recent_history(&conversation.id, 2).await.expect("history");
        let contents: Vec<_> = history.iter().map(|turn| turn.content.as_str()).collect();
        assert_eq!(contents, vec!["two", "three"]);

        assert!(repo.deactivate(&conversation.id).await.expect("deactivate"));
        assert!(repo.list_active_conversations(&user.id).await.expect("list").is_empty());
    }
}
