use std::sync::Arc;

use shopdesk_agent::{
    GenerationError, GenerationSettings, OpenAiCompatibleClient, ResponseGenerator, SupportAgent,
};
use shopdesk_core::config::{AppConfig, ConfigError, LoadOptions};
use shopdesk_db::repositories::{SqlCommerceRepository, SqlConversationRepository};
use shopdesk_db::{connect_with_settings, migrations, DbPool};
use thiserror::Error;
use tracing::info;

use crate::conversation::ConversationService;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub agent: Arc<SupportAgent>,
    pub conversations: Arc<ConversationService>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client setup failed: {0}")]
    LlmClient(#[source] GenerationError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let client =
        OpenAiCompatibleClient::from_config(&config.llm).map_err(BootstrapError::LlmClient)?;
    let generator =
        ResponseGenerator::new(Arc::new(client), GenerationSettings::from(&config.llm));
    let agent = Arc::new(SupportAgent::new(
        Arc::new(SqlCommerceRepository::new(db_pool.clone())),
        generator,
    ));
    let conversations = Arc::new(ConversationService::new(
        Arc::new(SqlConversationRepository::new(db_pool.clone())),
        agent.clone(),
    ));
    info!(
        event_name = "system.bootstrap.agent_ready",
        correlation_id = "bootstrap",
        provider = ?config.llm.provider,
        model = %config.llm.model,
        "support agent initialized"
    );

    Ok(Application { config, db_pool, agent, conversations })
}
