use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use shopdesk_core::config::{default_config_paths, AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let llm_api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact_token(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    let fields: Vec<(&str, String, Vec<&str>)> = vec![
        ("database.url", config.database.url.clone(), vec!["SHOPDESK_DATABASE_URL"]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            vec!["SHOPDESK_DATABASE_MAX_CONNECTIONS"],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            vec!["SHOPDESK_DATABASE_TIMEOUT_SECS"],
        ),
        ("llm.provider", format!("{:?}", config.llm.provider), vec!["SHOPDESK_LLM_PROVIDER"]),
        ("llm.api_key", llm_api_key, vec!["SHOPDESK_LLM_API_KEY", "GROQ_API_KEY"]),
        (
            "llm.base_url",
            config.llm.effective_base_url().to_string(),
            vec!["SHOPDESK_LLM_BASE_URL"],
        ),
        ("llm.model", config.llm.model.clone(), vec!["SHOPDESK_LLM_MODEL"]),
        ("llm.max_tokens", config.llm.max_tokens.to_string(), vec!["SHOPDESK_LLM_MAX_TOKENS"]),
        ("llm.temperature", config.llm.temperature.to_string(), vec!["SHOPDESK_LLM_TEMPERATURE"]),
        ("llm.timeout_secs", config.llm.timeout_secs.to_string(), vec!["SHOPDESK_LLM_TIMEOUT_SECS"]),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            vec!["SHOPDESK_SERVER_BIND_ADDRESS"],
        ),
        ("server.port", config.server.port.to_string(), vec!["SHOPDESK_SERVER_PORT"]),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            vec!["SHOPDESK_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        (
            "server.cors_allowed_origins",
            config.server.cors_allowed_origins.join(","),
            vec!["SHOPDESK_SERVER_CORS_ALLOWED_ORIGINS"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            vec!["SHOPDESK_LOGGING_LEVEL", "SHOPDESK_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            vec!["SHOPDESK_LOGGING_FORMAT", "SHOPDESK_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in &fields {
        lines.push(render_line(key, value, source(*key, env_keys.as_slice())));
    }
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    default_config_paths().into_iter().find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, field_source, redact_token};

    #[test]
    fn redaction_keeps_only_the_key_prefix() {
        assert_eq!(redact_token("gsk-abcdef123"), "gsk-***");
        assert_eq!(redact_token("plainsecret"), "<redacted>");
        assert_eq!(redact_token("   "), "<empty>");
    }

    #[test]
    fn dotted_paths_resolve_into_nested_tables() {
        let doc: Value = "[llm]\nmodel = \"llama3-70b\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "llm.model"));
        assert!(!contains_path(&doc, "llm.api_key"));
        assert!(!contains_path(&doc, "server.port"));
    }

    #[test]
    fn file_source_is_reported_when_no_env_key_is_set() {
        let doc: Value = "[server]\nport = 9000\n".parse().expect("toml");

        let source = field_source(
            "server.port",
            &["SHOPDESK_TEST_UNSET_PORT_KEY"],
            Some(&doc),
            Some(std::path::Path::new("shopdesk.toml")),
        );

        assert_eq!(source, "file (shopdesk.toml)");
        assert_eq!(field_source("server.bind_address", &[], Some(&doc), None), "default");
    }
}
