use std::sync::Arc;

use shopdesk_agent::{GenerationSettings, OpenAiCompatibleClient, ResponseGenerator, SupportAgent};
use shopdesk_db::repositories::SqlCommerceRepository;

use crate::commands::{connect_and_migrate, run_async, CommandResult};

/// Run the reply pipeline once, without conversation history, and print the
/// resulting reply as JSON.
pub fn run(message: &str) -> CommandResult {
    let result = run_async("ask", |config| async move {
        let client = OpenAiCompatibleClient::from_config(&config.llm)
            .map_err(|error| ("llm_client", error.to_string(), 3u8))?;
        let pool = connect_and_migrate(&config).await?;

        let agent = SupportAgent::new(
            Arc::new(SqlCommerceRepository::new(pool.clone())),
            ResponseGenerator::new(Arc::new(client), GenerationSettings::from(&config.llm)),
        );
        let reply = agent.reply(message, &[]).await;
        pool.close().await;

        serde_json::to_string_pretty(&reply)
            .map_err(|error| ("serialization", error.to_string(), 3u8))
    });

    match result {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(failure) => failure,
    }
}
