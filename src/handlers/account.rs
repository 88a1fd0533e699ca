//! Web account endpoints: signup, login, logout
//!
//! Credentials are stored and compared as-is, matching the front-end this
//! API serves; transport security is the deployment's concern. Logout is a
//! data purge: the user's chat history and final-model record are deleted
//! and the deletion counts reported back.

use crate::handlers::AppState;
use crate::session::Session;
use crate::store::UserRecord;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    email: String,
}

/// The front-end sends the email under "username" on this endpoint
#[derive(Debug, Deserialize)]
pub struct ClearChatRequest {
    #[serde(default)]
    username: String,
}

fn store_failure(e: impl std::fmt::Display) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"status": "fail", "message": e.to_string()})),
    )
}

/// POST /signup handler
pub async fn signup_handler(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> impl IntoResponse {
    if request.name.is_empty() || request.email.is_empty() || request.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "fail", "message": "All fields are required"})),
        );
    }

    let user = UserRecord {
        user_id: request.email.clone(),
        username: request.name,
        password: request.password,
        platform: "web".to_string(),
        created_at: Utc::now(),
    };

    match state.chats().register_user(&user).await {
        Ok(true) => (
            StatusCode::OK,
            Json(json!({"status": "success", "message": "User registered successfully"})),
        ),
        Ok(false) => (
            StatusCode::CONFLICT,
            Json(json!({"status": "fail", "message": "Email already registered"})),
        ),
        Err(e) => {
            tracing::error!(user = %user.user_id, error = %e, "signup failed");
            store_failure(e)
        }
    }
}

/// POST /login handler
///
/// A successful login resets the conversation session so the user starts
/// from a clean slate; their chat history and final-model record survive.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> impl IntoResponse {
    if request.email.is_empty() || request.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "fail", "message": "Both email and password are required"})),
        );
    }

    let user = match state.chats().find_user(&request.email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"status": "fail", "message": "User not found. Please sign up."})),
            );
        }
        Err(e) => {
            tracing::error!(user = %request.email, error = %e, "login lookup failed");
            return store_failure(e);
        }
    };

    if user.password != request.password {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"status": "fail", "message": "Incorrect password"})),
        );
    }

    if let Err(e) = state
        .sessions()
        .put_session(&user.user_id, &Session::default())
        .await
    {
        // The login still succeeds; the next turn starts a fresh session anyway
        tracing::warn!(user = %user.user_id, error = %e, "failed to reset session on login");
    }

    tracing::info!(user = %user.user_id, "login successful");
    (
        StatusCode::OK,
        Json(json!({"status": "success", "email": user.user_id})),
    )
}

/// POST /clear_chat handler
///
/// Purges chat history only; the session and final-model record survive,
/// so the conversation continues with the same recommendation context.
pub async fn clear_chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ClearChatRequest>,
) -> impl IntoResponse {
    if request.username.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "fail", "message": "username is required"})),
        );
    }

    match state.chats().clear_history(&request.username).await {
        Ok(deleted) => {
            tracing::info!(user = %request.username, deleted, "chat history cleared");
            (
                StatusCode::OK,
                Json(json!({"status": "cleared", "deleted_count": deleted})),
            )
        }
        Err(e) => {
            tracing::error!(user = %request.username, error = %e, "clear_chat failed");
            store_failure(e)
        }
    }
}

/// POST /logout handler
pub async fn logout_handler(
    State(state): State<AppState>,
    Json(request): Json<LogoutRequest>,
) -> impl IntoResponse {
    if request.email.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "fail", "message": "email is required"})),
        );
    }

    let deleted_chats = match state.chats().clear_history(&request.email).await {
        Ok(count) => count,
        Err(e) => {
            tracing::error!(user = %request.email, error = %e, "logout history purge failed");
            return store_failure(e);
        }
    };

    let deleted_models = match state.sessions().clear_user(&request.email).await {
        Ok(count) => count,
        Err(e) => {
            tracing::error!(user = %request.email, error = %e, "logout session purge failed");
            return store_failure(e);
        }
    };

    tracing::info!(
        user = %request.email,
        deleted_chats,
        deleted_models,
        "logout purge complete"
    );

    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": format!("Data cleared for {}", request.email),
            "deleted_chats": deleted_chats,
            "deleted_models": deleted_models,
        })),
    )
}
