//! Health, platform status, and metrics endpoints

use crate::handlers::AppState;
use crate::platform::Platform;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;

/// GET /health handler
///
/// Liveness only: answers without touching the store or the completion
/// endpoint, so load balancers keep routing while collaborators flap.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "modelscout",
        "platforms": Platform::all().map(|p| p.as_str()),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// GET /platform-status handler
///
/// Per-platform user counts plus total chat volume, read from the store.
pub async fn platform_status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let counts = futures::try_join!(
        state.chats().user_count(Platform::Web),
        state.chats().user_count(Platform::WhatsApp),
        state.chats().user_count(Platform::Telegram),
        state.chats().user_count(Platform::Sms),
        state.chats().turn_count(),
    );
    let (web, whatsapp, telegram, sms, total_chats) = match counts {
        Ok(counts) => counts,
        Err(e) => {
            tracing::error!(error = %e, "platform status lookup failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "error", "message": e.to_string()})),
            );
        }
    };
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "timestamp": Utc::now().to_rfc3339(),
            "platforms": {
                "web": {"status": "active", "users": web},
                "whatsapp": {
                    "status": "active",
                    "users": whatsapp,
                    "friends": state.config().platforms.whatsapp_allowed.len(),
                },
                "telegram": {
                    "status": "active",
                    "users": telegram,
                    "bot_configured": state.telegram_configured(),
                },
                "sms": {"status": "active", "users": sms},
            },
            "total_users": web + whatsapp + telegram + sms,
            "total_chats": total_chats,
        })),
    )
}

/// GET /metrics handler
///
/// Prometheus text exposition format.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics().gather() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            tracing::error!(error = %e, "metrics encoding failed");
            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
        }
    }
}
