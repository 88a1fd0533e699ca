//! Modelscout HTTP server
//!
//! Starts an Axum web server that answers chat turns from web, WhatsApp,
//! Telegram, and SMS with AI model recommendations.

use clap::Parser;
use modelscout::cli::{Cli, Command, generate_config_template};
use modelscout::config::Config;
use modelscout::error::AppError;
use modelscout::handlers::{AppState, build_router};
use modelscout::intent::IntentClassifier;
use modelscout::llm::{ChatCompletionClient, CompletionService};
use modelscout::metrics::Metrics;
use modelscout::outbound::{SmsSender, TelegramSender};
use modelscout::pipeline::LlmPipeline;
use modelscout::router::ConversationRouter;
use modelscout::service::ChatService;
use modelscout::store::{
    CatalogEntry, CatalogRepository, ChatRepository, MemoryStore, RedisStore, SessionRepository,
};
use modelscout::telemetry;
use std::net::SocketAddr;
use std::sync::Arc;

type Repositories = (
    Arc<dyn SessionRepository>,
    Arc<dyn ChatRepository>,
    Arc<dyn CatalogRepository>,
);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = cli.command {
        match output {
            Some(path) => {
                std::fs::write(&path, generate_config_template())?;
                println!("Wrote configuration template to {path}");
            }
            None => print!("{}", generate_config_template()),
        }
        return Ok(());
    }

    let config = Config::from_file(&cli.config)?;
    telemetry::init(&config.observability.log_level);

    tracing::info!(
        "Starting modelscout server on {}:{}",
        config.server.host,
        config.server.port
    );

    let config = Arc::new(config);

    let completion: Arc<dyn CompletionService> =
        Arc::new(ChatCompletionClient::new(&config.llm, config.llm_api_key())?);

    let (sessions, chats, catalog) = build_repositories(&config).await?;

    let classifier = IntentClassifier::new(completion.clone());
    let router = ConversationRouter::new(
        completion.clone(),
        catalog.clone(),
        config.llm.temperature,
        config.llm.max_tokens,
    );
    let pipeline = Arc::new(LlmPipeline::new(
        completion,
        catalog.clone(),
        sessions.clone(),
    ));
    let metrics = Metrics::new()?;

    let service = Arc::new(ChatService::new(
        classifier,
        router,
        pipeline,
        sessions.clone(),
        chats.clone(),
        catalog,
        metrics.clone(),
    ));

    let telegram_token = config.telegram_token();
    let telegram_configured = telegram_token.is_some();
    let telegram = Arc::new(TelegramSender::new(&config.platforms, telegram_token)?);
    let sms = Arc::new(SmsSender::new(&config.platforms)?);

    let state = AppState::new(
        config.clone(),
        service,
        sessions,
        chats,
        metrics,
        telegram,
        sms,
        telegram_configured,
    );

    let app = build_router(state);

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0])),
        config.server.port,
    ));

    tracing::info!("Listening on {}", addr);
    tracing::info!("Health check available at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Pick the store backend from config
///
/// A configured Redis URL selects the pooled Redis store; otherwise the
/// in-memory store runs, optionally seeded with a catalog file.
async fn build_repositories(config: &Config) -> Result<Repositories, AppError> {
    if config.store.redis_url.is_some() {
        let store = Arc::new(RedisStore::connect(&config.store).await?);
        return Ok((store.clone(), store.clone(), store));
    }

    tracing::warn!("no Redis URL configured, running on the in-memory store");
    let store = Arc::new(MemoryStore::new());
    if let Some(path) = &config.store.catalog_file {
        let entries = load_catalog(path)?;
        tracing::info!(count = entries.len(), file = %path, "seeded model catalog");
        store.seed_catalog(entries).await;
    }
    Ok((store.clone(), store.clone(), store))
}

fn load_catalog(path: &str) -> Result<Vec<CatalogEntry>, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("failed to read catalog file {path}: {e}")))?;
    serde_json::from_str(&content)
        .map_err(|e| AppError::Config(format!("failed to parse catalog file {path}: {e}")))
}
