//! Outbound message delivery
//!
//! Telegram and SMS are push channels: the webhook reply body is not shown
//! to the user, so the formatted text is transmitted separately through a
//! platform transport. Transports live behind [`OutboundSender`] so
//! handlers never touch HTTP details and tests can capture sends.

use crate::config::PlatformsConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// One-way delivery of a rendered reply to a platform recipient
#[async_trait]
pub trait OutboundSender: Send + Sync {
    /// Deliver `text` to `recipient` (chat id or full phone number)
    async fn send(&self, recipient: &str, text: &str) -> AppResult<()>;
}

#[derive(Debug, Serialize)]
struct TelegramSendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Telegram Bot API transport (`sendMessage`, HTML parse mode)
pub struct TelegramSender {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl TelegramSender {
    /// Build from the `[platforms]` config; a missing bot token disables
    /// delivery rather than failing startup
    pub fn new(config: &PlatformsConfig, token: Option<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {e}")))?;

        if token.is_none() {
            tracing::warn!("Telegram bot token not set, outbound Telegram delivery disabled");
        }

        Ok(Self {
            client,
            api_base: config.telegram_api_base.trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[async_trait]
impl OutboundSender for TelegramSender {
    async fn send(&self, recipient: &str, text: &str) -> AppResult<()> {
        let Some(token) = &self.token else {
            tracing::warn!(chat_id = recipient, "dropping Telegram reply, no bot token configured");
            return Ok(());
        };

        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let body = TelegramSendMessage {
            chat_id: recipient,
            text,
            parse_mode: "HTML",
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::PlatformDelivery {
                platform: "telegram".to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::PlatformDelivery {
                platform: "telegram".to_string(),
                reason: format!("HTTP {status}: {detail}"),
            });
        }

        tracing::info!(chat_id = recipient, chars = text.len(), "Telegram reply delivered");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SmsGatewayRequest<'a> {
    to: &'a str,
    message: &'a str,
}

/// SMS transport: an HTTP gateway when configured, otherwise a logging
/// stub (hardware modem transports belong to the deployment, not here)
pub struct SmsSender {
    client: reqwest::Client,
    gateway_url: Option<String>,
}

impl SmsSender {
    pub fn new(config: &PlatformsConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {e}")))?;

        if config.sms_gateway_url.is_none() {
            tracing::warn!("no SMS gateway configured, outbound SMS will be logged only");
        }

        Ok(Self {
            client,
            gateway_url: config.sms_gateway_url.clone(),
        })
    }
}

#[async_trait]
impl OutboundSender for SmsSender {
    async fn send(&self, recipient: &str, text: &str) -> AppResult<()> {
        let Some(url) = &self.gateway_url else {
            tracing::info!(phone = recipient, sms = text, "SMS gateway not configured, logging reply");
            return Ok(());
        };

        let body = SmsGatewayRequest {
            to: recipient,
            message: text,
        };

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::PlatformDelivery {
                platform: "sms".to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::PlatformDelivery {
                platform: "sms".to_string(),
                reason: format!("gateway returned HTTP {status}"),
            });
        }

        tracing::info!(phone = recipient, chars = text.len(), "SMS reply delivered");
        Ok(())
    }
}
