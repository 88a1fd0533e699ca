//! Modelscout - multi-platform conversational AI model advisor
//!
//! Routes user messages from web, WhatsApp, Telegram, and SMS through an
//! LLM-delegated intent classifier and conversation router, recommends AI
//! models from a catalog, and persists sessions and chat history in a
//! document store.

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod handlers;
pub mod intent;
pub mod llm;
pub mod metrics;
pub mod middleware;
pub mod outbound;
pub mod pipeline;
pub mod platform;
pub mod router;
pub mod service;
pub mod session;
pub mod store;
pub mod telemetry;
