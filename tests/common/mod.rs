//! Shared fixtures for integration tests
//!
//! Builds the full Axum app on the in-memory store with a scripted
//! completion service and capturing outbound transports, so no test
//! touches the network.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use modelscout::config::Config;
use modelscout::error::{AppError, AppResult};
use modelscout::handlers::{AppState, build_router};
use modelscout::intent::IntentClassifier;
use modelscout::llm::CompletionService;
use modelscout::metrics::Metrics;
use modelscout::outbound::OutboundSender;
use modelscout::pipeline::{PipelineReport, RecommendationPipeline};
use modelscout::router::ConversationRouter;
use modelscout::service::ChatService;
use modelscout::store::{CatalogEntry, MemoryStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Completion service that pops scripted responses in order and counts
/// calls; an exhausted script fails like an unreachable endpoint
pub struct ScriptedCompletion {
    responses: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedCompletion {
    pub fn new<S: Into<String>>(responses: Vec<S>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _temperature: f64,
        _max_tokens: u32,
    ) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(AppError::Completion {
                endpoint: "scripted".to_string(),
                reason: "script exhausted".to_string(),
            });
        }
        Ok(responses.remove(0))
    }
}

/// Pipeline stub returning one fixed report for every run
pub struct FixedPipeline {
    pub report: PipelineReport,
}

impl FixedPipeline {
    pub fn empty() -> Self {
        Self {
            report: PipelineReport::default(),
        }
    }

    pub fn recommending(model: &str, alternatives: Vec<&str>) -> Self {
        let mut shortlist = vec![model.to_string()];
        shortlist.extend(alternatives.into_iter().map(String::from));
        Self {
            report: PipelineReport {
                report_text: format!(
                    "Final Best Model Recommended:\n1. Model Name      : {model}"
                ),
                shortlist,
                final_model: Some(model.to_string()),
            },
        }
    }
}

#[async_trait]
impl RecommendationPipeline for FixedPipeline {
    async fn run(
        &self,
        _requirement: &str,
        _user_id: &str,
        _is_new: bool,
    ) -> AppResult<PipelineReport> {
        Ok(self.report.clone())
    }
}

/// Outbound transport that records every send instead of delivering
#[derive(Default)]
pub struct CapturingSender {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl CapturingSender {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl OutboundSender for CapturingSender {
    async fn send(&self, recipient: &str, text: &str) -> AppResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), text.to_string()));
        Ok(())
    }
}

/// Config with one allow-listed WhatsApp number and no Redis
pub fn test_config() -> Config {
    Config::from_toml(
        r#"
[server]
host = "127.0.0.1"
port = 5000

[llm]
base_url = "http://localhost:9999/v1"
model = "test-model"

[platforms]
whatsapp_allowed = ["919876543210"]
"#,
    )
    .expect("test config should parse")
}

pub fn sample_catalog() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            key: "gpt-4o".into(),
            name: "GPT-4o".into(),
            accuracy: Some("0.97".into()),
            speed: Some("Fast".into()),
            cloud: Some("Azure".into()),
            pricing: Some("$5/1M tokens".into()),
            region: Some("East US".into()),
            ..CatalogEntry::default()
        },
        CatalogEntry {
            key: "claude".into(),
            name: "Claude".into(),
            accuracy: Some("0.96".into()),
            speed: Some("Fast".into()),
            cloud: Some("AWS".into()),
            pricing: Some("$3/1M tokens".into()),
            region: Some("us-east-1".into()),
            ..CatalogEntry::default()
        },
    ]
}

pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub completion: Arc<ScriptedCompletion>,
    pub telegram: Arc<CapturingSender>,
    pub sms: Arc<CapturingSender>,
}

/// Assemble the full route table on in-memory collaborators
pub async fn build_app(
    completion: Arc<ScriptedCompletion>,
    pipeline: Arc<dyn RecommendationPipeline>,
) -> TestApp {
    let config = Arc::new(test_config());
    let store = Arc::new(MemoryStore::new());
    store.seed_catalog(sample_catalog()).await;

    let metrics = Metrics::new().expect("metrics");
    let classifier = IntentClassifier::new(completion.clone());
    let router = ConversationRouter::new(
        completion.clone(),
        store.clone(),
        config.llm.temperature,
        config.llm.max_tokens,
    );
    let service = Arc::new(ChatService::new(
        classifier,
        router,
        pipeline,
        store.clone(),
        store.clone(),
        store.clone(),
        metrics.clone(),
    ));

    let telegram = CapturingSender::new();
    let sms = CapturingSender::new();

    let state = AppState::new(
        config,
        service,
        store.clone(),
        store.clone(),
        metrics,
        telegram.clone(),
        sms.clone(),
        true,
    );

    TestApp {
        app: build_router(state),
        store,
        completion,
        telegram,
        sms,
    }
}
