//! Messaging-platform webhooks
//!
//! WhatsApp, Telegram, and SMS deliveries land here. Each handler resolves
//! the sender to a canonical user id, auto-registers first-time users, runs
//! the turn, and pushes the reply back out through the platform transport.
//! Gateways resend on non-2xx, so processing failures after a valid payload
//! still answer 200 with an error status in the body.

use crate::handlers::AppState;
use crate::platform::{self, Platform};
use crate::store::UserRecord;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;

const TELEGRAM_FALLBACK_USERNAME: &str = "TelegramUser";

/// WhatsApp gateway payload; gateways disagree on field spelling, so the
/// sender and text fields each accept the common variants
#[derive(Debug, Deserialize)]
pub struct WhatsAppDelivery {
    #[serde(default, alias = "From")]
    from: String,
    #[serde(default, alias = "text", alias = "body")]
    message: String,
}

/// Telegram Bot API update (the subset this service reads)
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    #[serde(default)]
    message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    chat: TelegramChat,
    #[serde(default)]
    text: String,
    #[serde(default)]
    from: Option<TelegramUser>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
}

/// SMS gateway payload with the same field-spelling tolerance
#[derive(Debug, Deserialize)]
pub struct SmsDelivery {
    #[serde(default, alias = "From", alias = "mobile")]
    from: String,
    #[serde(default, alias = "Body", alias = "text")]
    body: String,
}

fn missing_fields(state: &AppState, platform: Platform) -> (StatusCode, Json<serde_json::Value>) {
    state.metrics().record_webhook_rejection(platform, "missing_fields");
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"status": "error", "message": "Missing phone or message"})),
    )
}

async fn auto_register(state: &AppState, user: UserRecord) {
    match state.chats().register_user(&user).await {
        Ok(true) => {
            tracing::info!(user = %user.user_id, platform = %user.platform, "auto-registered new user");
        }
        Ok(false) => {}
        Err(e) => {
            // Registration is bookkeeping; the turn proceeds regardless
            tracing::warn!(user = %user.user_id, error = %e, "auto-registration failed");
        }
    }
}

/// POST /whatsapp-webhook handler
///
/// Only senders on the configured allow-list are served; everyone else
/// gets 403 without any turn processing. The reply travels back in the
/// response body for the gateway to deliver.
pub async fn whatsapp_handler(
    State(state): State<AppState>,
    Json(delivery): Json<WhatsAppDelivery>,
) -> impl IntoResponse {
    let text = delivery.message.trim();
    let Some(national) = platform::normalize_phone(&delivery.from) else {
        return missing_fields(&state, Platform::WhatsApp);
    };
    if text.is_empty() {
        return missing_fields(&state, Platform::WhatsApp);
    }

    let full_phone = platform::full_number(&national);
    if !state
        .config()
        .platforms
        .whatsapp_allowed
        .contains(&full_phone)
    {
        tracing::warn!(phone = %full_phone, "rejected WhatsApp message from unlisted sender");
        state
            .metrics()
            .record_webhook_rejection(Platform::WhatsApp, "unauthorized");
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"status": "unauthorized", "message": "Not authorized"})),
        );
    }

    auto_register(
        &state,
        UserRecord::auto_registered(
            &full_phone,
            &format!("WhatsApp_{national}"),
            Platform::WhatsApp,
        ),
    )
    .await;

    let reply = state
        .service()
        .process_turn(&full_phone, text, Platform::WhatsApp)
        .await;

    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "response": reply.text,
            "to": delivery.from,
        })),
    )
}

/// POST /telegram-webhook handler
///
/// Commands (`/start`, `/help`) answer with fixed bot messages; everything
/// else runs a full turn. The reply is pushed through the Bot API, not the
/// webhook response, and a failed push does not fail the webhook (Telegram
/// would redeliver the update otherwise).
pub async fn telegram_handler(
    State(state): State<AppState>,
    Json(update): Json<TelegramUpdate>,
) -> impl IntoResponse {
    let Some(message) = update.message else {
        return missing_fields(&state, Platform::Telegram);
    };
    let text = message.text.trim().to_string();
    if text.is_empty() {
        return missing_fields(&state, Platform::Telegram);
    }

    let chat_id = message.chat.id.to_string();
    let username = message
        .from
        .and_then(|u| u.username.or(u.first_name))
        .unwrap_or_else(|| TELEGRAM_FALLBACK_USERNAME.to_string());

    if text.starts_with('/') {
        return telegram_command(&state, &chat_id, &text, &username).await;
    }

    let user_id = format!("telegram_{chat_id}");
    auto_register(
        &state,
        UserRecord::auto_registered(&user_id, &format!("Telegram_{username}"), Platform::Telegram),
    )
    .await;

    let reply = state
        .service()
        .process_turn(&user_id, &text, Platform::Telegram)
        .await;

    deliver_telegram(&state, &chat_id, &reply.text).await;
    (StatusCode::OK, Json(json!({"status": "success"})))
}

async fn telegram_command(
    state: &AppState,
    chat_id: &str,
    command: &str,
    username: &str,
) -> (StatusCode, Json<serde_json::Value>) {
    let reply = match command {
        "/start" => format!(
            "🤖 Welcome to AI Model Selector Bot, {username}!\n\n\
             I help you find the perfect AI model for your needs.\n\n\
             💡 Just describe what you want to do:\n\
             • \"I need AI for image recognition\"\n\
             • \"Help me with text summarization\"\n\
             • \"I want to build a chatbot\"\n\n\
             🚀 What AI task can I help you with today?"
        ),
        "/help" => "🆘 How to use AI Model Selector:\n\n\
             1️⃣ Describe your AI need\n\
             2️⃣ Get personalized recommendations\n\
             3️⃣ Ask follow-up questions about models\n\n\
             💭 Example questions:\n\
             • \"What's the best model for document analysis?\"\n\
             • \"I need real-time image processing\"\n\
             • \"Help me choose between GPT models\"\n\n\
             Need help? Just ask! 😊"
            .to_string(),
        _ => "Unknown command. Type /help for assistance.".to_string(),
    };

    deliver_telegram(state, chat_id, &reply).await;
    (StatusCode::OK, Json(json!({"status": "success"})))
}

async fn deliver_telegram(state: &AppState, chat_id: &str, text: &str) {
    if let Err(e) = state.telegram().send(chat_id, text).await {
        tracing::error!(chat_id, error = %e, "Telegram delivery failed");
    }
}

/// POST /sms-webhook handler
///
/// SMS senders are not allow-listed: anyone who texts the number gets an
/// answer, delivered through the SMS transport.
pub async fn sms_handler(
    State(state): State<AppState>,
    Json(delivery): Json<SmsDelivery>,
) -> impl IntoResponse {
    let text = delivery.body.trim();
    let Some(national) = platform::normalize_phone(&delivery.from) else {
        return missing_fields(&state, Platform::Sms);
    };
    if text.is_empty() {
        return missing_fields(&state, Platform::Sms);
    }

    let full_phone = platform::full_number(&national);
    let user_id = format!("sms_{full_phone}");

    auto_register(
        &state,
        UserRecord::auto_registered(&user_id, &format!("SMS_{national}"), Platform::Sms),
    )
    .await;

    let reply = state
        .service()
        .process_turn(&user_id, text, Platform::Sms)
        .await;

    if let Err(e) = state.sms().send(&full_phone, &reply.text).await {
        tracing::error!(phone = %full_phone, error = %e, "SMS delivery failed");
    }

    (StatusCode::OK, Json(json!({"status": "success"})))
}
