use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shopdesk_core::errors::{ApplicationError, InterfaceError};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::conversation::{
    ChatRequest, ChatResponse, ConversationService, ConversationSummary, MessageView,
};

#[derive(Clone)]
pub struct ChatState {
    conversations: Arc<ConversationService>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub message: &'static str,
    pub version: &'static str,
    pub features: [&'static str; 4],
}

#[derive(Clone, Debug, Deserialize)]
pub struct TitleQuery {
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub message: String,
}

/// JSON error envelope carrying the correlation id of the failed request.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl ApiError {
    fn from_application(error: ApplicationError, correlation_id: String) -> Self {
        Self(error.into_interface(correlation_id))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            InterfaceError::BadRequest { message, .. } => (StatusCode::BAD_REQUEST, message),
            InterfaceError::NotFound { message, .. } => (StatusCode::NOT_FOUND, message),
            InterfaceError::ServiceUnavailable { message, .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, message)
            }
            InterfaceError::Internal { message, .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        if status.is_server_error() {
            error!(
                event_name = "server.request.failed",
                correlation_id = self.0.correlation_id(),
                status = status.as_u16(),
                detail = %detail,
                "request failed"
            );
        } else {
            warn!(
                event_name = "server.request.rejected",
                correlation_id = self.0.correlation_id(),
                status = status.as_u16(),
                detail = %detail,
                "request rejected"
            );
        }

        let body = json!({
            "error": self.0.user_message(),
            "detail": detail,
            "correlation_id": self.0.correlation_id(),
        });
        (status, Json(body)).into_response()
    }
}

pub fn router(conversations: Arc<ConversationService>) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/api/chat", post(chat))
        .route("/chat", post(chat))
        // `{id}` is the user email for GET and the conversation id for DELETE.
        .route("/api/conversations/{id}", get(list_conversations).delete(deactivate_conversation))
        .route("/api/conversations/{id}/messages", get(list_messages))
        .route("/api/conversations/{id}/title", put(rename_conversation))
        .with_state(ChatState { conversations })
}

fn correlation_id() -> String {
    Uuid::new_v4().to_string()
}

pub async fn banner() -> Json<Banner> {
    Json(Banner {
        message: "Shopdesk customer support chat API",
        version: env!("CARGO_PKG_VERSION"),
        features: [
            "Database-backed conversations",
            "OpenAI-compatible LLM integration",
            "Multi-user support",
            "Conversation history",
        ],
    })
}

pub async fn chat(
    State(state): State<ChatState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let correlation_id = correlation_id();
    info!(
        event_name = "server.chat.received",
        correlation_id = %correlation_id,
        resumed = request.conversation_id.is_some(),
        "chat request received"
    );

    match state.conversations.chat(request, &correlation_id).await {
        Ok(response) => Ok(Json(response)),
        Err(error) => Err(ApiError::from_application(error, correlation_id)),
    }
}

pub async fn list_conversations(
    State(state): State<ChatState>,
    Path(user_email): Path<String>,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    state
        .conversations
        .conversations_for(&user_email)
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, correlation_id()))
}

pub async fn list_messages(
    State(state): State<ChatState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Vec<MessageView>>, ApiError> {
    state
        .conversations
        .messages(&conversation_id)
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, correlation_id()))
}

pub async fn rename_conversation(
    State(state): State<ChatState>,
    Path(conversation_id): Path<String>,
    Query(query): Query<TitleQuery>,
) -> Result<Json<Acknowledgement>, ApiError> {
    state
        .conversations
        .rename(&conversation_id, &query.title)
        .await
        .map_err(|error| ApiError::from_application(error, correlation_id()))?;

    Ok(Json(Acknowledgement { message: "Conversation title updated successfully".to_string() }))
}

pub async fn deactivate_conversation(
    State(state): State<ChatState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Acknowledgement>, ApiError> {
    state
        .conversations
        .deactivate(&conversation_id)
        .await
        .map_err(|error| ApiError::from_application(error, correlation_id()))?;

    Ok(Json(Acknowledgement { message: "Conversation deactivated successfully".to_string() }))
}
