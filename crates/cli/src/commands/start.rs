use shopdesk_agent::OpenAiCompatibleClient;

use crate::commands::{connect_and_migrate, run_async, CommandResult};

/// Preflight for `shopdesk-server`: everything bootstrap does short of binding
/// the listener.
pub fn run() -> CommandResult {
    let result = run_async("start", |config| async move {
        let pool = connect_and_migrate(&config).await?;
        pool.close().await;

        let client = OpenAiCompatibleClient::from_config(&config.llm)
            .map_err(|error| ("llm_client", error.to_string(), 3u8))?;
        Ok(format!(
            "preflight passed; server would listen on {}:{} using model `{}` at {}",
            config.server.bind_address,
            config.server.port,
            config.llm.model,
            client.base_url()
        ))
    });

    match result {
        Ok(message) => CommandResult::success("start", message),
        Err(failure) => failure,
    }
}
