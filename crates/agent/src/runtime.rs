use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use shopdesk_core::domain::conversation::ConversationTurn;
use shopdesk_db::repositories::CommerceRepository;

use crate::fallback::fallback_reply;
use crate::intent::{classify, IntentTag};
use crate::llm::{GenerationSettings, LlmClient, ResponseGenerator};
use crate::prompt::PromptBuilder;
use crate::resolver::{DataResolver, ResolvedData};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedReply {
    pub text: String,
    pub used_fallback: bool,
    pub intent: IntentTag,
    pub data: ResolvedData,
}

/// Classify, resolve, prompt, generate, and fall back when generation fails.
/// Holds no per-request state and can be shared across tasks.
#[derive(Clone)]
pub struct SupportAgent {
    resolver: DataResolver,
    prompts: PromptBuilder,
    generator: ResponseGenerator,
}

impl SupportAgent {
    pub fn new(store: Arc<dyn CommerceRepository>, generator: ResponseGenerator) -> Self {
        Self { resolver: DataResolver::new(store), prompts: PromptBuilder::new(), generator }
    }

    pub fn with_client(
        store: Arc<dyn CommerceRepository>,
        client: Arc<dyn LlmClient>,
        settings: GenerationSettings,
    ) -> Self {
        Self::new(store, ResponseGenerator::new(client, settings))
    }

    pub fn model(&self) -> &str {
        &self.generator.settings().model
    }

    /// `history` is oldest first and may include the message being answered.
    pub async fn reply(&self, message: &str, history: &[ConversationTurn]) -> GeneratedReply {
        let intent = classify(message);
        let data = self.resolver.resolve(intent, message).await;
        let prompt = self.prompts.build(intent, &data, history, message);

        match self.generator.generate(&prompt.system, &prompt.user_content()).await {
            Ok(text) => {
                info!(
                    event_name = "agent.reply.generated",
                    intent = intent.as_str(),
                    used_fallback = false,
                    "reply generated"
                );
                GeneratedReply { text, used_fallback: false, intent, data }
            }
            Err(error) => {
                warn!(
                    event_name = "agent.reply.fallback",
                    intent = intent.as_str(),
                    error = %error,
                    "generation failed, using fallback reply"
                );
                let text = fallback_reply(intent, &data);
                GeneratedReply { text, used_fallback: true, intent, data }
            }
        }
    }
}
