use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use shopdesk_agent::{IntentTag, ResolvedData, SupportAgent};
use shopdesk_core::domain::conversation::{Conversation, ConversationId, Message, UserId};
use shopdesk_core::errors::{ApplicationError, DomainError};
use shopdesk_db::repositories::{ConversationRepository, RepositoryError};

pub const DEFAULT_USER_EMAIL: &str = "anonymous@example.com";
pub const HISTORY_LIMIT: u32 = 10;
pub const MESSAGE_PAGE_LIMIT: u32 = 100;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplyMetadata {
    pub model: String,
    pub intent: IntentTag,
    pub used_fallback: bool,
}

impl ReplyMetadata {
    fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("model".to_string(), Value::String(self.model.clone()));
        map.insert("intent".to_string(), Value::String(self.intent.as_str().to_string()));
        map.insert("used_fallback".to_string(), Value::Bool(self.used_fallback));
        map
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub conversation_id: ConversationId,
    pub data: ResolvedData,
    pub metadata: ReplyMetadata,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: ConversationId,
    pub title: String,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub total_messages: u64,
    pub user_messages: u64,
    pub ai_messages: u64,
    pub is_active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageView {
    pub id: String,
    pub content: String,
    pub is_user_message: bool,
    pub created_at: String,
    pub metadata: Map<String, Value>,
}

impl From<Message> for MessageView {
    fn from(message: Message) -> Self {
        Self {
            id: message.id.to_string(),
            content: message.content,
            is_user_message: message.is_user_message,
            created_at: message.created_at.to_rfc3339(),
            metadata: message.metadata,
        }
    }
}

/// Persists both sides of a chat exchange around one agent reply.
pub struct ConversationService {
    conversations: Arc<dyn ConversationRepository>,
    agent: Arc<SupportAgent>,
}

impl ConversationService {
    pub fn new(conversations: Arc<dyn ConversationRepository>, agent: Arc<SupportAgent>) -> Self {
        Self { conversations, agent }
    }

    pub async fn chat(
        &self,
        request: ChatRequest,
        correlation_id: &str,
    ) -> Result<ChatResponse, ApplicationError> {
        if request.message.trim().is_empty() {
            return Err(DomainError::EmptyMessage.into());
        }
        let email = request
            .user_email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .unwrap_or(DEFAULT_USER_EMAIL);

        let user =
            self.conversations.get_or_create_user(email, "Anonymous", "User").await.map_err(persistence)?;
        let conversation = self.resume_or_start(&user.id, request.conversation_id.as_deref()).await?;

        self.conversations
            .append_message(&conversation.id, &request.message, true, Map::new())
            .await
            .map_err(persistence)?;
        let history = self
            .conversations
            .recent_history(&conversation.id, HISTORY_LIMIT)
            .await
            .map_err(persistence)?;

        let reply = self.agent.reply(&request.message, &history).await;
        let metadata = ReplyMetadata {
            model: self.agent.model().to_string(),
            intent: reply.intent,
            used_fallback: reply.used_fallback,
        };

        self.conversations
            .append_message(&conversation.id, &reply.text, false, metadata.to_map())
            .await
            .map_err(persistence)?;

        info!(
            event_name = "server.chat.replied",
            correlation_id,
            conversation_id = %conversation.id,
            intent = reply.intent.as_str(),
            used_fallback = reply.used_fallback,
            "chat reply persisted"
        );

        Ok(ChatResponse {
            response: reply.text,
            conversation_id: conversation.id,
            data: reply.data,
            metadata,
        })
    }

    async fn resume_or_start(
        &self,
        user_id: &UserId,
        requested: Option<&str>,
    ) -> Result<Conversation, ApplicationError> {
        if let Some(id) = requested.and_then(|raw| raw.trim().parse::<ConversationId>().ok()) {
            if let Some(existing) =
                self.conversations.find_conversation(&id).await.map_err(persistence)?
            {
                if existing.is_owned_by(user_id) {
                    return Ok(existing);
                }
            }
        }

        self.conversations.create_conversation(user_id, None).await.map_err(persistence)
    }

    /// Active conversations for an email, most recently updated first. An
    /// unknown email has no conversations.
    pub async fn conversations_for(
        &self,
        email: &str,
    ) -> Result<Vec<ConversationSummary>, ApplicationError> {
        let Some(user) = self.conversations.find_user_by_email(email).await.map_err(persistence)?
        else {
            return Ok(Vec::new());
        };

        let conversations =
            self.conversations.list_active_conversations(&user.id).await.map_err(persistence)?;
        let mut summaries = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let counts =
                self.conversations.message_counts(&conversation.id).await.map_err(persistence)?;
            summaries.push(ConversationSummary {
                conversation_id: conversation.id,
                title: conversation.title,
                created_at: conversation.created_at.to_rfc3339(),
                updated_at: conversation.updated_at.map(|at| at.to_rfc3339()),
                total_messages: counts.total,
                user_messages: counts.from_user,
                ai_messages: counts.from_assistant,
                is_active: conversation.is_active,
            });
        }
        Ok(summaries)
    }

    /// Newest first, at most [`MESSAGE_PAGE_LIMIT`].
    pub async fn messages(&self, conversation_id: &str) -> Result<Vec<MessageView>, ApplicationError> {
        let id = parse_conversation_id(conversation_id)?;
        if self.conversations.find_conversation(&id).await.map_err(persistence)?.is_none() {
            return Err(ApplicationError::NotFound(format!("conversation {id}")));
        }

        let messages =
            self.conversations.list_messages(&id, MESSAGE_PAGE_LIMIT).await.map_err(persistence)?;
        Ok(messages.into_iter().map(MessageView::from).collect())
    }

    pub async fn rename(&self, conversation_id: &str, title: &str) -> Result<(), ApplicationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DomainError::InvariantViolation("title must not be empty".to_string()).into());
        }
        let id = parse_conversation_id(conversation_id)?;
        if !self.conversations.update_title(&id, title).await.map_err(persistence)? {
            return Err(ApplicationError::NotFound(format!("conversation {id}")));
        }
        Ok(())
    }

    pub async fn deactivate(&self, conversation_id: &str) -> Result<(), ApplicationError> {
        let id = parse_conversation_id(conversation_id)?;
        if !self.conversations.deactivate(&id).await.map_err(persistence)? {
            return Err(ApplicationError::NotFound(format!("conversation {id}")));
        }
        Ok(())
    }
}

fn parse_conversation_id(raw: &str) -> Result<ConversationId, ApplicationError> {
    raw.trim().parse().map_err(|_| {
        DomainError::InvalidIdentifier { kind: "conversation", value: raw.to_string() }.into()
    })
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}
