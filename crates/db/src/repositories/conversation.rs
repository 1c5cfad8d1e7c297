use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use shopdesk_core::domain::conversation::{
    Conversation, ConversationId, ConversationTurn, Message, MessageId, User, UserId,
};

use super::{
    format_timestamp, now_micros, parse_optional_timestamp, parse_timestamp, ConversationRepository,
    MessageCounts, RepositoryError,
};
use crate::DbPool;

pub struct SqlConversationRepository {
    pool: DbPool,
}

impl SqlConversationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ConversationRepository for SqlConversationRepository {
    async fn get_or_create_user(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, RepositoryError> {
        sqlx::query(
            "INSERT INTO users (id, email, first_name, last_name, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(email) DO NOTHING",
        )
        .bind(UserId::generate().to_string())
        .bind(email)
        .bind(first_name)
        .bind(last_name)
        .bind(format_timestamp(&now_micros()))
        .execute(&self.pool)
        .await?;

        self.find_user_by_email(email)
            .await?
            .ok_or_else(|| RepositoryError::Decode(format!("user `{email}` vanished after insert")))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, email, first_name, last_name, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row).transpose()
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
            title: title
                .map(str::to_owned)
                .unwrap_or_else(|| Conversation::default_title(now)),
            created_at: now,
            updated_at: None,
            is_active: true,
        };

        sqlx::query(
            "INSERT INTO conversations (id, user_id, title, created_at, updated_at, is_active)
             VALUES (?, ?, ?, ?, NULL, 1)",
        )
        .bind(conversation.id.to_string())
        .bind(conversation.user_id.to_string())
        .bind(&conversation.title)
        .bind(format_timestamp(&conversation.created_at))
        .execute(&self.pool)
        .await?;

        Ok(conversation)
    }

    async fn find_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, user_id, title, created_at, updated_at, is_active
             FROM conversations
             WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(conversation_from_row).transpose()
    }

    async fn list_active_conversations(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, title, created_at, updated_at, is_active
             FROM conversations
             WHERE user_id = ? AND is_active = 1
             ORDER BY COALESCE(updated_at, created_at) DESC, rowid DESC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(conversation_from_row).collect()
    }

    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        content: &str,
        is_user_message: bool,
        metadata: Map<String, Value>,
    ) -> Result<Message, RepositoryError> {
        let message = Message {
            id: MessageId::generate(),
            conversation_id: *conversation_id,
            content: content.to_owned(),
            is_user_message,
            created_at: now_micros(),
            metadata,
        };
        let metadata_json = serde_json::to_string(&message.metadata)
            .map_err(|error| RepositoryError::Decode(format!("metadata encode: {error}")))?;
        let created_at = format_timestamp(&message.created_at);

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, content, is_user_message, created_at,
                                   metadata_json)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(message.id.to_string())
        .bind(message.conversation_id.to_string())
        .bind(&message.content)
        .bind(message.is_user_message)
        .bind(&created_at)
        .bind(metadata_json)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(&created_at)
            .bind(message.conversation_id.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(message)
    }

    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, conversation_id, content, is_user_message, created_at, metadata_json
             FROM messages
             WHERE conversation_id = ?
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?",
        )
        .bind(conversation_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(message_from_row).collect()
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
        let (total, from_user): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(is_user_message), 0)
             FROM messages
             WHERE conversation_id = ?",
        )
        .bind(conversation_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        let total = u64::try_from(total)
            .map_err(|_| RepositoryError::Decode(format!("negative message count {total}")))?;
        let from_user = u64::try_from(from_user)
            .map_err(|_| RepositoryError::Decode(format!("negative message count {from_user}")))?;
        Ok(MessageCounts { total, from_user, from_assistant: total.saturating_sub(from_user) })
    }

    async fn update_title(
        &self,
        conversation_id: &ConversationId,
        title: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE conversations SET title = ?, updated_at = ? WHERE id = ?")
            .bind(title)
            .bind(format_timestamp(&now_micros()))
            .bind(conversation_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn deactivate(&self, conversation_id: &ConversationId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE conversations SET is_active = 0 WHERE id = ?")
            .bind(conversation_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn parse_uuid<T: std::str::FromStr>(column: &str, value: String) -> Result<T, RepositoryError> {
    value
        .parse()
        .map_err(|_| RepositoryError::Decode(format!("invalid uuid in `{column}`: `{value}`")))
}

fn user_from_row(row: SqliteRow) -> Result<User, RepositoryError> {
    let created_at: String = row.try_get("created_at")?;
    Ok(User {
        id: parse_uuid("id", row.try_get("id")?)?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

fn conversation_from_row(row: SqliteRow) -> Result<Conversation, RepositoryError> {
    let created_at: String = row.try_get("created_at")?;
    Ok(Conversation {
        id: parse_uuid("id", row.try_get("id")?)?,
        user_id: parse_uuid("user_id", row.try_get("user_id")?)?,
        title: row.try_get("title")?,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_optional_timestamp("updated_at", row.try_get("updated_at")?)?,
        is_active: row.try_get("is_active")?,
    })
}

fn message_from_row(row: SqliteRow) -> Result<Message, RepositoryError> {
    let created_at: String = row.try_get("created_at")?;
    let metadata_json: String = row.try_get("metadata_json")?;
    let metadata = serde_json::from_str::<Map<String, Value>>(&metadata_json).map_err(|error| {
        RepositoryError::Decode(format!("invalid metadata_json `{metadata_json}` ({error})"))
    })?;

    Ok(Message {
        id: parse_uuid("id", row.try_get("id")?)?,
        conversation_id: parse_uuid("conversation_id", row.try_get("conversation_id")?)?,
        content: row.try_get("content")?,
        is_user_message: row.try_get("is_user_message")?,
        created_at: parse_timestamp("created_at", &created_at)?,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use shopdesk_core::domain::conversation::ConversationId;

    use super::SqlConversationRepository;
    use crate::migrations;
    use crate::repositories::ConversationRepository;
    use crate::{connect_with_settings, DbPool};

    async fn setup() -> (DbPool, SqlConversationRepository) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        (pool.clone(), SqlConversationRepository::new(pool))
    }

    #[tokio::test]
    async fn get_or_create_user_is_idempotent_per_email() {
        let (pool, repo) = setup().await;

        let first = repo.get_or_create_user("ana@example.com", "Ana", "Lima").await.expect("create");
        let second =
            repo.get_or_create_user("ana@example.com", "Other", "Name").await.expect("lookup");

        assert_eq!(first, second);
        assert_eq!(second.first_name, "Ana");
        assert_eq!(repo.find_user_by_email("nobody@example.com").await.expect("find"), None);

        pool.close().await;
    }

    #[tokio::test]
    async fn conversation_gets_default_title_and_round_trips() {
        let (pool, repo) = setup().await;
        let user = repo.get_or_create_user("ana@example.com", "Ana", "Lima").await.expect("user");

        let created = repo.create_conversation(&user.id, None).await.expect("create");
        assert!(created.title.starts_with("Conversation "));
        assert!(created.is_active);

        let found = repo.find_conversation(&created.id).await.expect("find");
        assert_eq!(found, Some(created));
        assert_eq!(
            repo.find_conversation(&ConversationId::generate()).await.expect("find missing"),
            None
        );

        pool.close().await;
    }

    #[tokio::test]
    async fn messages_are_listed_newest_first_and_history_oldest_first() {
        let (pool, repo) = setup().await;
        let user = repo.get_or_create_user("ana@example.com", "Ana", "Lima").await.expect("user");
        let conversation =
            repo.create_conversation(&user.id, Some("Orders")).await.expect("conversation");

        for index in 0..4 {
            repo.append_message(&conversation.id, &format!("m{index}"), index % 2 == 0, Map::new())
                .await
                .expect("append");
        }

        let listed = repo.list_messages(&conversation.id, 3).await.expect("list");
        let contents: Vec<_> = listed.iter().map(|message| message.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m2", "m1"]);

        let counts = repo.message_counts(&conversation.id).await.expect("counts");
        assert_eq!((counts.total, counts.from_user, counts.from_assistant), (4, 2, 2));

        let history = repo.recent_history(&conversation.id, 3).await.expect("history");
        let contents: Vec<_> = history.iter().map(|turn| turn.content.as_str()).collect();
        assert_eq!(contents, vec!["m1", "m2", "m3"]);
        assert!(!history[0].is_user_message);
        assert!(history[1].is_user_message);

        pool.close().await;
    }

    #[tokio::test]
    async fn append_message_persists_metadata_and_bumps_updated_at() {
        let (pool, repo) = setup().await;
        let user = repo.get_or_create_user("ana@example.com", "Ana", "Lima").await.expect("user");
        let conversation = repo.create_conversation(&user.id, None).await.expect("conversation");
        assert_eq!(conversation.updated_at, None);

        let mut metadata = Map::new();
        metadata.insert("intent".to_string(), json!("order_status"));
        metadata.insert("used_fallback".to_string(), Value::Bool(true));
        let message = repo
            .append_message(&conversation.id, "Order 4521 is shipped", false, metadata.clone())
            .await
            .expect("append");

        let stored = repo.list_messages(&conversation.id, 10).await.expect("list");
        assert_eq!(stored, vec![message.clone()]);
        assert_eq!(stored[0].metadata, metadata);

        let refreshed =
            repo.find_conversation(&conversation.id).await.expect("find").expect("exists");
        assert_eq!(refreshed.updated_at, Some(message.created_at));

        pool.close().await;
    }

    #[tokio::test]
    async fn append_to_unknown_conversation_fails() {
        let (pool, repo) = setup().await;

        let result =
            repo.append_message(&ConversationId::generate(), "hello", true, Map::new()).await;
        assert!(result.is_err());

        pool.close().await;
    }

    #[tokio::test]
    async fn rename_and_deactivate_report_whether_a_row_changed() {
        let (pool, repo) = setup().await;
        let user = repo.get_or_create_user("ana@example.com", "Ana", "Lima").await.expect("user");
        let kept = repo.create_conversation(&user.id, Some("Kept")).await.expect("kept");
        let closed = repo.create_conversation(&user.id, Some("Closed")).await.expect("closed");

        assert!(repo.update_title(&kept.id, "Renamed").await.expect("rename"));
        assert!(repo.deactivate(&closed.id).await.expect("deactivate"));
        assert!(!repo.deactivate(&ConversationId::generate()).await.expect("deactivate missing"));
        assert!(!repo.update_title(&ConversationId::generate(), "x").await.expect("rename missing"));

        let active = repo.list_active_conversations(&user.id).await.expect("list");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].title, "Renamed");

        pool.close().await;
    }

    #[tokio::test]
    async fn active_conversations_are_ordered_by_latest_activity() {
        let (pool, repo) = setup().await;
        let user = repo.get_or_create_user("ana@example.com", "Ana", "Lima").await.expect("user");
        let older = repo.create_conversation(&user.id, Some("Older")).await.expect("older");
        let newer = repo.create_conversation(&user.id, Some("Newer")).await.expect("newer");

        repo.append_message(&older.id, "bump", true, Map::new()).await.expect("append");

        let active = repo.list_active_conversations(&user.id).await.expect("list");
        let titles: Vec<_> = active.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Older", "Newer"]);
        assert_eq!(active[1].id, newer.id);

        pool.close().await;
    }
}
