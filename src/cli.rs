//! Command-line interface for modelscout
//!
//! Provides argument parsing and subcommand handling for the modelscout binary.

use clap::{Parser, Subcommand};

/// Multi-platform conversational AI model advisor
#[derive(Parser)]
#[command(name = "modelscout")]
#[command(version)]
#[command(about = "Multi-platform conversational AI model advisor")]
#[command(
    long_about = "Modelscout answers web, WhatsApp, Telegram, and SMS messages with \
    AI model recommendations, delegating intent classification and report \
    generation to an OpenAI-compatible completion endpoint."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# Modelscout Configuration
# ========================
#
# This file configures the HTTP server, the completion endpoint, the
# document store, messaging platforms, and observability settings.
# Secrets never live in this file: the config names the environment
# variables that hold them.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER CONFIGURATION
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"

# Port to listen on
port = 5000

# Request timeout in seconds
request_timeout_seconds = 30

# ─────────────────────────────────────────────────────────────────────────────
# COMPLETION ENDPOINT
# ─────────────────────────────────────────────────────────────────────────────
#
# One OpenAI-compatible /chat/completions endpoint serves every LLM-delegated
# decision: intent classification, conversational replies, and the
# recommendation pipeline. Per-call temperature and token budgets are chosen
# internally; the values below are the defaults for conversational replies.

[llm]
# API base URL (must end with /v1 for OpenAI-compatible APIs)
base_url = "http://localhost:1234/v1"

# Model identifier sent with every request
model = "your-model"

# Environment variable holding the bearer token.
# Leave the variable unset for endpoints that run without authentication.
api_key_env = "MODELSCOUT_LLM_API_KEY"

# Default sampling temperature for generated replies (0.0-2.0)
temperature = 0.7

# Default token budget for generated replies
max_tokens = 500

# Timeout around each completion call, in seconds
request_timeout_seconds = 30

# ─────────────────────────────────────────────────────────────────────────────
# DOCUMENT STORE
# ─────────────────────────────────────────────────────────────────────────────

[store]
# Redis connection URL. Comment out to run on the in-memory store
# (tests and local development only - state is lost on restart).
redis_url = "redis://127.0.0.1:6379"

# TTL for session and final-model documents, in seconds (default: 7 days)
session_ttl_seconds = 604800

# Connection pool size
pool_size = 16

# JSON file of catalog entries, seeded into the in-memory store at startup.
# Ignored when redis_url is set (the Redis deployment seeds its own catalog).
# catalog_file = "catalog.json"

# ─────────────────────────────────────────────────────────────────────────────
# MESSAGING PLATFORMS
# ─────────────────────────────────────────────────────────────────────────────

[platforms]
# WhatsApp allow-list: full numbers with country code.
# An empty list means the WhatsApp webhook rejects everything.
whatsapp_allowed = []

# Environment variable holding the Telegram bot token.
# Leave the variable unset to disable outbound Telegram delivery.
telegram_token_env = "MODELSCOUT_TELEGRAM_TOKEN"

# Telegram Bot API base URL (override for tests)
telegram_api_base = "https://api.telegram.org"

# Optional HTTP SMS gateway; when unset, outbound SMS is logged only.
# sms_gateway_url = "http://localhost:8090/send"

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
log_level = "info"

# Prometheus metrics are always available at /metrics on the server port
# For production, consider using a reverse proxy to restrict access
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        // Clap's built-in verification for the CLI structure
        Cli::command().debug_assert();
    }

    #[test]
    fn default_config_path() {
        let cli = Cli::parse_from(["modelscout"]);
        assert_eq!(cli.config, "config.toml");
        assert!(cli.command.is_none());
    }

    #[test]
    fn custom_config_path() {
        let cli = Cli::parse_from(["modelscout", "--config", "custom.toml"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn config_subcommand() {
        let cli = Cli::parse_from(["modelscout", "config"]);
        assert!(matches!(
            cli.command,
            Some(Command::Config { output: None })
        ));
    }

    #[test]
    fn config_subcommand_with_output() {
        let cli = Cli::parse_from(["modelscout", "config", "-o", "my-config.toml"]);
        assert!(matches!(
            cli.command,
            Some(Command::Config { output: Some(ref path) }) if path == "my-config.toml"
        ));
    }

    #[test]
    fn template_is_valid_toml() {
        let template = generate_config_template();
        let result: Result<toml::Value, _> = toml::from_str(template);
        assert!(
            result.is_ok(),
            "Template should be valid TOML: {:?}",
            result.err()
        );
    }

    #[test]
    fn template_parses_as_full_config() {
        let config = crate::config::Config::from_toml(generate_config_template())
            .expect("template should satisfy config validation");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.store.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
        assert!(config.platforms.whatsapp_allowed.is_empty());
    }

    #[test]
    fn template_has_all_sections() {
        let template = generate_config_template();
        assert!(template.contains("[server]"));
        assert!(template.contains("[llm]"));
        assert!(template.contains("[store]"));
        assert!(template.contains("[platforms]"));
        assert!(template.contains("[observability]"));
    }
}
