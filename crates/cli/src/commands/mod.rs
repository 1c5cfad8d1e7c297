pub mod ask;
pub mod config;
pub mod doctor;
pub mod migrate;
pub mod seed;
pub mod start;

use serde::Serialize;
use shopdesk_core::config::{AppConfig, LoadOptions};
use shopdesk_db::{connect_with_settings, DbPool};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

/// Error class, message and exit code of a failed command step.
pub(crate) type StepFailure = (&'static str, String, u8);

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    fn from_step(command: &str, (error_class, message, exit_code): StepFailure) -> Self {
        Self::failure(command, error_class, message, exit_code)
    }
}

/// Load and validate config, then run `step` on a fresh current-thread runtime.
pub(crate) fn run_async<T, F, Fut>(command: &str, step: F) -> Result<T, CommandResult>
where
    F: FnOnce(AppConfig) -> Fut,
    Fut: std::future::Future<Output = Result<T, StepFailure>>,
{
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })?;

    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        })?;

    runtime.block_on(step(config)).map_err(|failure| CommandResult::from_step(command, failure))
}

pub(crate) async fn connect(config: &AppConfig) -> Result<DbPool, StepFailure> {
    connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| ("db_connectivity", error.to_string(), 4u8))
}

pub(crate) async fn connect_and_migrate(config: &AppConfig) -> Result<DbPool, StepFailure> {
    let pool = connect(config).await?;
    shopdesk_db::migrations::run_pending(&pool)
        .await
        .map_err(|error| ("migration", error.to_string(), 5u8))?;
    Ok(pool)
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
