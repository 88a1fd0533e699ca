//! Turn orchestration
//!
//! `ChatService::process_turn` is the single entry point every platform
//! adapter calls. It loads the session, classifies, routes, runs the
//! recommendation pipeline when the router hands off, formats the reply,
//! and persists the turn. It never returns an error upward: any failure
//! inside a turn degrades to a fixed, user-safe reply.

use crate::format::{self, ResponseKind};
use crate::intent::{HISTORY_WINDOW, IntentClassifier};
use crate::metrics::Metrics;
use crate::pipeline::RecommendationPipeline;
use crate::platform::Platform;
use crate::router::{ConversationRouter, ProceedAction, RouteOutcome, model_info_block};
use crate::session::Session;
use crate::store::{CatalogRepository, ChatRepository, SessionRepository, TurnRecord};
use std::sync::Arc;
use std::time::Instant;

/// Reply when the inbound message is empty after trimming; produced
/// before any external call is made
pub const EMPTY_INPUT_PROMPT: &str =
    "Please type a message so I can help you find the right AI model.";

/// Fixed apology when a turn fails beyond recovery
pub const TURN_APOLOGY: &str =
    "Sorry, I'm having trouble processing your request right now. Please try again.";

/// Reply when a re-query after shortlist exhaustion finds nothing
pub const NO_MORE_MODELS: &str = "No more suitable models found. \
    Would you like to try a different approach or modify your requirements?";

/// Final reply of one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    /// Display text, already rendered for the requesting platform
    pub text: String,
    /// Model under discussion after this turn, if any
    pub current_model: Option<String>,
}

/// Injected-dependency facade over one conversation turn
pub struct ChatService {
    classifier: IntentClassifier,
    router: ConversationRouter,
    pipeline: Arc<dyn RecommendationPipeline>,
    sessions: Arc<dyn SessionRepository>,
    chats: Arc<dyn ChatRepository>,
    catalog: Arc<dyn CatalogRepository>,
    metrics: Metrics,
}

impl ChatService {
    pub fn new(
        classifier: IntentClassifier,
        router: ConversationRouter,
        pipeline: Arc<dyn RecommendationPipeline>,
        sessions: Arc<dyn SessionRepository>,
        chats: Arc<dyn ChatRepository>,
        catalog: Arc<dyn CatalogRepository>,
        metrics: Metrics,
    ) -> Self {
        Self {
            classifier,
            router,
            pipeline,
            sessions,
            chats,
            catalog,
            metrics,
        }
    }

    /// Process one inbound message and produce the final reply
    ///
    /// Infallible by contract: every failure path inside the turn resolves
    /// to a user-visible reply, and persistence failures are logged without
    /// costing the user their answer.
    pub async fn process_turn(
        &self,
        user_id: &str,
        message: &str,
        platform: Platform,
    ) -> TurnReply {
        let started = Instant::now();

        let trimmed = message.trim();
        if trimmed.is_empty() {
            // No store or completion call happens for empty input
            return TurnReply {
                text: format::render_for_platform(EMPTY_INPUT_PROMPT, platform),
                current_model: None,
            };
        }

        let reply = match self.run_turn(user_id, trimmed, platform).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(user = user_id, error = %e, "turn failed, replying with apology");
                TurnReply {
                    text: TURN_APOLOGY.to_string(),
                    current_model: None,
                }
            }
        };

        self.metrics
            .record_turn_duration(platform, started.elapsed().as_secs_f64() * 1000.0);

        TurnReply {
            text: format::render_for_platform(&reply.text, platform),
            current_model: reply.current_model,
        }
    }

    async fn run_turn(
        &self,
        user_id: &str,
        message: &str,
        platform: Platform,
    ) -> crate::error::AppResult<TurnReply> {
        let mut session = self.load_session(user_id).await;
        let history = self.load_history(user_id).await;

        let intent = self
            .classifier
            .classify(message, &history, session.current_model.as_deref())
            .await;
        tracing::info!(user = user_id, %platform, %intent, "routing turn");

        let outcome = self
            .router
            .handle(intent, message, &mut session, &history)
            .await;

        let display_text = match outcome {
            RouteOutcome::Reply { text, kind } => {
                format::format(&text, kind, session.current_model.as_deref())
            }
            RouteOutcome::Proceed(action) => {
                self.run_pipeline(user_id, action, &mut session).await
            }
        };

        // The reply is already decided; store failures from here on are
        // logged and do not surface to the user
        if let Err(e) = self.sessions.put_session(user_id, &session).await {
            tracing::warn!(user = user_id, error = %e, "failed to persist session");
        }
        let turn = TurnRecord::new(user_id, message, &display_text, platform);
        if let Err(e) = self.chats.append_turn(&turn).await {
            tracing::warn!(user = user_id, error = %e, "failed to append chat turn");
        }
        self.metrics.record_turn(platform, intent);

        Ok(TurnReply {
            text: display_text,
            current_model: session.current_model,
        })
    }

    /// Load the session, merging the persisted final-model record so a
    /// returning user resumes the conversation about their last pick
    async fn load_session(&self, user_id: &str) -> Session {
        let mut session = match self.sessions.get_session(user_id).await {
            Ok(Some(session)) => session,
            Ok(None) => Session::default(),
            Err(e) => {
                tracing::warn!(user = user_id, error = %e, "session load failed, starting fresh");
                Session::default()
            }
        };

        if session.current_model.is_none() {
            match self.sessions.get_final_model(user_id).await {
                Ok(Some(record)) => {
                    session.current_model = Some(record.model_name);
                    if session.original_requirement.is_empty() {
                        session.original_requirement = record.requirement;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(user = user_id, error = %e, "final-model lookup failed");
                }
            }
        }

        session
    }

    async fn load_history(&self, user_id: &str) -> Vec<TurnRecord> {
        match self.chats.recent_turns(user_id, HISTORY_WINDOW).await {
            Ok(turns) => turns,
            Err(e) => {
                tracing::warn!(user = user_id, error = %e, "history load failed, classifying without context");
                Vec::new()
            }
        }
    }

    /// Execute the hand-off decided by the router
    ///
    /// A still-available shortlist candidate is offered directly; otherwise
    /// the recommendation pipeline is (re-)queried and its shortlist adopted
    /// into the session.
    async fn run_pipeline(
        &self,
        user_id: &str,
        action: ProceedAction,
        session: &mut Session,
    ) -> String {
        if let Some(model) = &action.offered_model {
            let mut reply = action.notice.clone();
            match model_info_block(self.catalog.as_ref(), model).await {
                Ok(Some(info)) => {
                    reply.push_str("\n\n");
                    reply.push_str(&info);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, model, "catalog detail lookup failed");
                }
            }
            return format::format(&reply, ResponseKind::Recommendation, Some(model));
        }

        match self
            .pipeline
            .run(&action.requirement, user_id, action.is_new)
            .await
        {
            Ok(report) if report.is_empty() => {
                self.metrics.record_pipeline_run("empty");
                format::format(NO_MORE_MODELS, ResponseKind::General, None)
            }
            Ok(report) => {
                self.metrics.record_pipeline_run("report");
                session.adopt_shortlist(report.shortlist);
                if let Some(model) = report.final_model {
                    session.current_model = Some(model);
                }
                format::format(
                    &report.report_text,
                    ResponseKind::Recommendation,
                    session.current_model.as_deref(),
                )
            }
            Err(e) => {
                tracing::error!(user = user_id, error = %e, "recommendation pipeline failed");
                self.metrics.record_pipeline_run("failed");
                self.metrics.record_completion_failure("recommend");
                TURN_APOLOGY.to_string()
            }
        }
    }
}
