use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub Uuid);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

macro_rules! uuid_id {
    ($name:ident) => {
        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value).map(Self)
            }
        }
    };
}

uuid_id!(UserId);
uuid_id!(ConversationId);
uuid_id!(MessageId);

/// A chat participant, identified by email.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub user_id: UserId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl Conversation {
    pub fn default_title(now: DateTime<Utc>) -> String {
        format!("Conversation {}", now.format("%Y-%m-%d %H:%M"))
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }
}

/// A persisted chat message. Messages are append-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub content: String,
    pub is_user_message: bool,
    pub created_at: DateTime<Utc>,
    pub metadata: Map<String, Value>,
}

/// One entry of conversation history as seen by the reply pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub content: String,
    pub is_user_message: bool,
    pub created_at: DateTime<Utc>,
    pub metadata: Map<String, Value>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self { content: content.into(), is_user_message: true, created_at, metadata: Map::new() }
    }

    pub fn assistant(content: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self { content: content.into(), is_user_message: false, created_at, metadata: Map::new() }
    }
}

impl From<Message> for ConversationTurn {
    fn from(message: Message) -> Self {
        Self {
            content: message.content,
            is_user_message: message.is_user_message,
            created_at: message.created_at,
            metadata: message.metadata,
        }
    }
}
