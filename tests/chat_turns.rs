//! Integration tests for the web /chat endpoint and /history
//!
//! The full route table runs against the in-memory store with scripted
//! completion responses, so every test is hermetic.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::{FixedPipeline, ScriptedCompletion, build_app};
use modelscout::router::GENERATION_APOLOGY;
use modelscout::service::EMPTY_INPUT_PROMPT;
use std::sync::Arc;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("body is JSON")
}

fn chat_request(email: &str, message: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({"email": email, "message": message}).to_string(),
        ))
        .expect("build request")
}

#[tokio::test]
async fn test_greeting_turn_end_to_end() {
    let completion = ScriptedCompletion::new(vec![
        "Greeting",
        "Hello! What AI task can I help with?",
    ]);
    let test = build_app(completion, Arc::new(FixedPipeline::empty())).await;

    let response = test
        .app
        .oneshot(chat_request("u@example.com", "hi"))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers().contains_key("x-request-id"),
        "request id header must be echoed"
    );

    let body = body_json(response).await;
    let text = body["response"].as_str().expect("response text");
    assert!(text.contains("Hello! What AI task can I help with?"));
    assert!(body["current_model"].is_null());
}

#[tokio::test]
async fn test_empty_message_short_circuits_without_completion_calls() {
    let completion = ScriptedCompletion::new(Vec::<String>::new());
    let test = build_app(completion.clone(), Arc::new(FixedPipeline::empty())).await;

    let response = test
        .app
        .oneshot(chat_request("u@example.com", "   "))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["response"], EMPTY_INPUT_PROMPT);
    assert_eq!(completion.calls(), 0, "empty input must not reach the LLM");
}

#[tokio::test]
async fn test_failing_completion_never_escapes_as_http_error() {
    // Classification fails and degrades to OffTopic; the redirect
    // generation fails too and degrades to the fixed apology
    let completion = ScriptedCompletion::new(Vec::<String>::new());
    let test = build_app(completion, Arc::new(FixedPipeline::empty())).await;

    let response = test
        .app
        .oneshot(chat_request("u@example.com", "recommend something"))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["response"], GENERATION_APOLOGY);
}

#[tokio::test]
async fn test_new_requirement_returns_report_and_current_model() {
    let completion = ScriptedCompletion::new(vec!["NewRequirement"]);
    let pipeline = Arc::new(FixedPipeline::recommending("GPT-4o", vec!["Claude"]));
    let test = build_app(completion, pipeline).await;

    let response = test
        .app
        .oneshot(chat_request("u@example.com", "I need OCR for invoices"))
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(
        body["response"]
            .as_str()
            .unwrap()
            .contains("Final Best Model Recommended")
    );
    assert_eq!(body["current_model"], "GPT-4o");
}

#[tokio::test]
async fn test_rejection_offers_next_shortlisted_model_without_pipeline() {
    let completion = ScriptedCompletion::new(vec!["NewRequirement", "ModelRejection"]);
    let pipeline = Arc::new(FixedPipeline::recommending("GPT-4o", vec!["Claude"]));
    let test = build_app(completion, pipeline).await;

    let first = test
        .app
        .clone()
        .oneshot(chat_request("u@example.com", "I need OCR"))
        .await
        .expect("request");
    assert_eq!(body_json(first).await["current_model"], "GPT-4o");

    let second = test
        .app
        .oneshot(chat_request("u@example.com", "suggest another"))
        .await
        .expect("request");
    let body = body_json(second).await;
    assert_eq!(body["current_model"], "Claude");
    let text = body["response"].as_str().unwrap();
    assert!(text.contains("Claude"));
    // Catalog details ride along with the offer
    assert!(text.contains("Pricing"));
}

#[tokio::test]
async fn test_missing_email_is_rejected() {
    let completion = ScriptedCompletion::new(Vec::<String>::new());
    let test = build_app(completion.clone(), Arc::new(FixedPipeline::empty())).await;

    let request = Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"email": "", "message": "hi"}"#))
        .expect("build request");

    let response = test.app.oneshot(request).await.expect("request");
    assert!(response.status().is_client_error());
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn test_history_returns_alternating_user_and_agent_rows() {
    let completion = ScriptedCompletion::new(vec![
        "Greeting",
        "Hello there!",
        "Goodbye",
        "See you soon!",
    ]);
    let test = build_app(completion, Arc::new(FixedPipeline::empty())).await;

    for message in ["hi", "bye"] {
        let response = test
            .app
            .clone()
            .oneshot(chat_request("u@example.com", message))
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = test
        .app
        .oneshot(
            Request::builder()
                .uri("/history/u@example.com")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    let rows = body_json(response).await;
    let rows = rows.as_array().expect("array body");
    assert_eq!(rows.len(), 4, "two turns yield four rows");
    assert_eq!(rows[0]["email"], "u@example.com");
    assert_eq!(rows[0]["message"], "hi");
    assert_eq!(rows[1]["username"], "Agent");
    assert_eq!(rows[2]["message"], "bye");
    assert_eq!(rows[3]["username"], "Agent");
}

#[tokio::test]
async fn test_history_for_unknown_user_is_empty() {
    let completion = ScriptedCompletion::new(Vec::<String>::new());
    let test = build_app(completion, Arc::new(FixedPipeline::empty())).await;

    let response = test
        .app
        .oneshot(
            Request::builder()
                .uri("/history/stranger@example.com")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_metrics_endpoint_reports_turns() {
    let completion = ScriptedCompletion::new(vec!["Greeting", "Hello!"]);
    let test = build_app(completion, Arc::new(FixedPipeline::empty())).await;

    test.app
        .clone()
        .oneshot(chat_request("u@example.com", "hi"))
        .await
        .expect("request");

    let response = test
        .app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let text = String::from_utf8(bytes.to_vec()).expect("utf8 body");
    assert!(text.contains("modelscout_turns_total"));
    assert!(text.contains("intent=\"Greeting\""));
}
