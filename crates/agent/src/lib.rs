//! Support agent - grounded reply pipeline for store chat
//!
//! This crate turns one inbound chat message into a reply that is grounded in
//! the store's catalog, order, and inventory data:
//!
//! 1. **Intent classification** (`intent`) - keyword rules map text to an [`IntentTag`]
//! 2. **Data resolution** (`resolver`) - one lookup per intent, misses become `NotFound`
//! 3. **Prompt building** (`prompt`) - system persona, history window, user block
//! 4. **Generation** (`llm`) - OpenAI-compatible chat completion behind [`LlmClient`]
//! 5. **Fallback** (`fallback`) - deterministic text when generation fails
//!
//! [`SupportAgent`] in `runtime` composes the steps. The agent never writes to
//! the store; persisting turns is the caller's job.
//!
//! # Grounding Principle
//!
//! The model only phrases facts. Order states, counts, and stock numbers come
//! from the store, and the fallback text renders the same facts the prompt
//! hands to the model.

pub mod fallback;
pub mod intent;
pub mod llm;
pub mod prompt;
pub mod resolver;
pub mod runtime;

pub use fallback::fallback_reply;
pub use intent::{classify, IntentTag};
pub use llm::{
    ChatMessage, ChatRole, CompletionRequest, GenerationError, GenerationSettings, LlmClient,
    OpenAiCompatibleClient, ResponseGenerator,
};
pub use prompt::{Prompt, PromptBuilder};
pub use resolver::{DataResolver, InventorySnapshot, OrderSnapshot, ResolvedData};
pub use runtime::{GeneratedReply, SupportAgent};
