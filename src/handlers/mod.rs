//! HTTP request handlers for the modelscout API

use crate::config::Config;
use crate::metrics::Metrics;
use crate::middleware::request_id_middleware;
use crate::outbound::OutboundSender;
use crate::service::ChatService;
use crate::store::{ChatRepository, SessionRepository};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod account;
pub mod chat;
pub mod status;
pub mod webhooks;

/// Application state shared across all handlers
///
/// All fields are Arc'd for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    service: Arc<ChatService>,
    sessions: Arc<dyn SessionRepository>,
    chats: Arc<dyn ChatRepository>,
    metrics: Metrics,
    telegram: Arc<dyn OutboundSender>,
    sms: Arc<dyn OutboundSender>,
    telegram_configured: bool,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<Config>,
        service: Arc<ChatService>,
        sessions: Arc<dyn SessionRepository>,
        chats: Arc<dyn ChatRepository>,
        metrics: Metrics,
        telegram: Arc<dyn OutboundSender>,
        sms: Arc<dyn OutboundSender>,
        telegram_configured: bool,
    ) -> Self {
        Self {
            config,
            service,
            sessions,
            chats,
            metrics,
            telegram,
            sms,
            telegram_configured,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn service(&self) -> &ChatService {
        &self.service
    }

    pub fn sessions(&self) -> &dyn SessionRepository {
        self.sessions.as_ref()
    }

    pub fn chats(&self) -> &dyn ChatRepository {
        self.chats.as_ref()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn telegram(&self) -> &dyn OutboundSender {
        self.telegram.as_ref()
    }

    pub fn sms(&self) -> &dyn OutboundSender {
        self.sms.as_ref()
    }

    pub fn telegram_configured(&self) -> bool {
        self.telegram_configured
    }
}

/// Assemble the full route table with shared middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat::handler))
        .route("/history/{email}", get(chat::history_handler))
        .route("/whatsapp-webhook", post(webhooks::whatsapp_handler))
        .route("/telegram-webhook", post(webhooks::telegram_handler))
        .route("/sms-webhook", post(webhooks::sms_handler))
        .route("/signup", post(account::signup_handler))
        .route("/login", post(account::login_handler))
        .route("/clear_chat", post(account::clear_chat_handler))
        .route("/logout", post(account::logout_handler))
        .route("/health", get(status::health_handler))
        .route("/platform-status", get(status::platform_status_handler))
        .route("/metrics", get(status::metrics_handler))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
