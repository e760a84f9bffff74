use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use reacji_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_key: &str| {
        field_source(key_path, env_key, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "database.url",
        &config.database.url,
        source("database.url", "REACJI_DATABASE_URL"),
    ));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        source("database.max_connections", "REACJI_DATABASE_MAX_CONNECTIONS"),
    ));
    lines.push(render_line(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        source("database.timeout_secs", "REACJI_DATABASE_TIMEOUT_SECS"),
    ));

    let app_token = redact_token(config.slack.app_token.expose_secret());
    let bot_token = redact_token(config.slack.bot_token.expose_secret());
    lines.push(render_line(
        "slack.app_token",
        &app_token,
        source("slack.app_token", "REACJI_SLACK_APP_TOKEN"),
    ));
    lines.push(render_line(
        "slack.bot_token",
        &bot_token,
        source("slack.bot_token", "REACJI_SLACK_BOT_TOKEN"),
    ));

    let api_key = if config.embedding.api_key.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line(
        "embedding.api_key",
        api_key,
        source("embedding.api_key", "REACJI_EMBEDDING_API_KEY"),
    ));
    lines.push(render_line(
        "embedding.base_url",
        &config.embedding.base_url,
        source("embedding.base_url", "REACJI_EMBEDDING_BASE_URL"),
    ));
    lines.push(render_line(
        "embedding.model",
        &config.embedding.model,
        source("embedding.model", "REACJI_EMBEDDING_MODEL"),
    ));
    lines.push(render_line(
        "embedding.cache_capacity",
        &config.embedding.cache_capacity.to_string(),
        source("embedding.cache_capacity", "REACJI_EMBEDDING_CACHE_CAPACITY"),
    ));

    lines.push(render_line(
        "search.default_limit",
        &config.search.default_limit.to_string(),
        source("search.default_limit", "REACJI_SEARCH_DEFAULT_LIMIT"),
    ));
    lines.push(render_line(
        "search.breaker_failure_threshold",
        &config.search.breaker_failure_threshold.to_string(),
        source("search.breaker_failure_threshold", "REACJI_SEARCH_BREAKER_FAILURE_THRESHOLD"),
    ));
    lines.push(render_line(
        "search.breaker_timeout_secs",
        &config.search.breaker_timeout_secs.to_string(),
        source("search.breaker_timeout_secs", "REACJI_SEARCH_BREAKER_TIMEOUT_SECS"),
    ));

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        source("server.bind_address", "REACJI_SERVER_BIND_ADDRESS"),
    ));
    lines.push(render_line(
        "server.health_check_port",
        &config.server.health_check_port.to_string(),
        source("server.health_check_port", "REACJI_SERVER_HEALTH_CHECK_PORT"),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", "REACJI_LOGGING_LEVEL"),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", "REACJI_LOGGING_FORMAT"),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("reacji.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/reacji.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
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
