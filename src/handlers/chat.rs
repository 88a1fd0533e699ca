//! Web chat endpoint and chat history
//!
//! Handles POST /chat for the web front-end and GET /history/{email}.

use crate::handlers::AppState;
use crate::middleware::RequestId;
use crate::platform::Platform;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

/// Maximum allowed message length in characters
const MAX_MESSAGE_LENGTH: usize = 10_000;

/// Chat request from the web client
///
/// Validation is enforced during deserialization - invalid instances cannot
/// exist. An empty `message` is allowed: the chat service answers it with a
/// fixed prompt instead of an error.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurnRequest {
    email: String,
    message: String,
}

impl ChatTurnRequest {
    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl<'de> Deserialize<'de> for ChatTurnRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawChatTurnRequest {
            email: String,
            #[serde(default)]
            message: String,
        }

        let raw = RawChatTurnRequest::deserialize(deserializer)?;

        if raw.email.trim().is_empty() {
            return Err(serde::de::Error::custom("email cannot be empty"));
        }

        let char_count = raw.message.chars().count();
        if char_count > MAX_MESSAGE_LENGTH {
            return Err(serde::de::Error::custom(format!(
                "message exceeds maximum length of {MAX_MESSAGE_LENGTH} characters (got {char_count})"
            )));
        }

        Ok(ChatTurnRequest {
            email: raw.email,
            message: raw.message,
        })
    }
}

/// Chat response to the web client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurnResponse {
    pub response: String,
    pub current_model: Option<String>,
}

/// POST /chat handler
///
/// Runs one full conversation turn for a web user. The turn itself is
/// infallible: completion and store failures degrade to fixed replies
/// inside the chat service, so this handler always returns 200 for a
/// well-formed request.
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<ChatTurnRequest>,
) -> Json<ChatTurnResponse> {
    tracing::debug!(
        request_id = %request_id,
        user = request.email(),
        message_length = request.message().len(),
        "Received web chat request"
    );

    let reply = state
        .service()
        .process_turn(request.email(), request.message(), Platform::Web)
        .await;

    Json(ChatTurnResponse {
        response: reply.text,
        current_model: reply.current_model,
    })
}

/// GET /history/{email} handler
///
/// Returns the full chat history as alternating user/Agent rows, oldest
/// first, matching what the web front-end renders directly.
pub async fn history_handler(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> impl IntoResponse {
    match state.chats().full_history(&email).await {
        Ok(turns) => {
            let mut rows = Vec::with_capacity(turns.len() * 2);
            for turn in turns {
                let timestamp = turn.timestamp.to_rfc3339();
                rows.push(json!({
                    "email": email,
                    "message": turn.message,
                    "timestamp": timestamp,
                }));
                rows.push(json!({
                    "username": "Agent",
                    "message": turn.response,
                    "timestamp": timestamp,
                }));
            }
            (StatusCode::OK, Json(serde_json::Value::Array(rows)))
        }
        Err(e) => {
            tracing::error!(user = %email, error = %e, "history lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_deserializes() {
        let json = r#"{"email": "u@example.com", "message": "hi"}"#;
        let req: ChatTurnRequest = serde_json::from_str(json).expect("should deserialize");
        assert_eq!(req.email(), "u@example.com");
        assert_eq!(req.message(), "hi");
    }

    #[test]
    fn test_chat_request_allows_empty_message() {
        // The service answers empty input with a fixed prompt, so the
        // request shape must admit it
        let json = r#"{"email": "u@example.com", "message": ""}"#;
        let req: ChatTurnRequest = serde_json::from_str(json).expect("should deserialize");
        assert_eq!(req.message(), "");
    }

    #[test]
    fn test_chat_request_defaults_missing_message() {
        let json = r#"{"email": "u@example.com"}"#;
        let req: ChatTurnRequest = serde_json::from_str(json).expect("should deserialize");
        assert_eq!(req.message(), "");
    }

    #[test]
    fn test_chat_request_rejects_empty_email() {
        let json = r#"{"email": "  ", "message": "hi"}"#;
        let result = serde_json::from_str::<ChatTurnRequest>(json);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("email"));
    }

    #[test]
    fn test_chat_request_rejects_message_too_long() {
        let long = "a".repeat(10_001);
        let json = format!(r#"{{"email": "u@example.com", "message": "{long}"}}"#);
        let result = serde_json::from_str::<ChatTurnRequest>(&json);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("exceeds maximum length")
        );
    }

    #[test]
    fn test_chat_response_serializes() {
        let resp = ChatTurnResponse {
            response: "💡 GPT-4o fits.".to_string(),
            current_model: Some("GPT-4o".to_string()),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["response"], "💡 GPT-4o fits.");
        assert_eq!(json["current_model"], "GPT-4o");
    }
}
