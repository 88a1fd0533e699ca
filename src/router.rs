//! Conversation routing
//!
//! The router turns a classified intent into either a finished reply or a
//! hand-off to the recommendation pipeline, mutating the session along the
//! way. There is no persisted state machine: the effective state of a turn
//! is derived from `(intent, session)`, and the session carries across
//! turns.
//!
//! Every intent variant is matched exhaustively; adding an intent without
//! deciding its routing is a compile error. Failures while generating a
//! conversational reply never escape: they degrade to a fixed, user-safe
//! message so the turn always answers.

use crate::error::AppResult;
use crate::format::ResponseKind;
use crate::intent::{Intent, render_history};
use crate::llm::CompletionService;
use crate::session::Session;
use crate::store::{CatalogRepository, TurnRecord};
use std::sync::Arc;

/// Fixed fallback when reply generation fails mid-turn
pub const GENERATION_APOLOGY: &str =
    "I'm having trouble processing that right now. Please try again.";

/// Fixed reply for follow-up questions before any recommendation exists
pub const NO_MODEL_YET: &str =
    "I haven't recommended any model yet. Please tell me what AI task you need help with!";

const NEW_REQUIREMENT_NOTICE: &str =
    "Perfect! Let me analyze your requirement and find the best AI models for you.";

const EXHAUSTED_NOTICE: &str =
    "No problem! Let me search for more suitable alternatives that better match your needs.";

/// What the router decided for this turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The reply below is final for this turn; do not proceed downstream
    Reply { text: String, kind: ResponseKind },
    /// Hand off to the recommendation pipeline (or offer the next
    /// shortlisted candidate when one is already available)
    Proceed(ProceedAction),
}

/// Hand-off details for the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProceedAction {
    /// Requirement text to recommend against, verbatim
    pub requirement: String,
    /// True for a fresh requirement, false when narrowing after rejection
    pub is_new: bool,
    /// Set when the shortlist still held a candidate: the pipeline is not
    /// re-queried, this model (full display name) is offered instead
    pub offered_model: Option<String>,
    /// Interim message naming the action taken
    pub notice: String,
}

/// Session-scoped conversation router
pub struct ConversationRouter {
    completion: Arc<dyn CompletionService>,
    catalog: Arc<dyn CatalogRepository>,
    temperature: f64,
    max_tokens: u32,
}

impl ConversationRouter {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        catalog: Arc<dyn CatalogRepository>,
        temperature: f64,
        max_tokens: u32,
    ) -> Self {
        Self {
            completion,
            catalog,
            temperature,
            max_tokens,
        }
    }

    /// Route one classified message
    ///
    /// Mutates `session` per the transition rules and returns either the
    /// final reply text or a pipeline hand-off. Infallible: reply
    /// generation errors are absorbed into [`GENERATION_APOLOGY`].
    pub async fn handle(
        &self,
        intent: Intent,
        message: &str,
        session: &mut Session,
        history: &[TurnRecord],
    ) -> RouteOutcome {
        match intent {
            Intent::Greeting => RouteOutcome::Reply {
                text: self.generate(GREETING_PROMPT.to_string(), message).await,
                kind: ResponseKind::Greeting,
            },
            Intent::Goodbye => RouteOutcome::Reply {
                text: self.generate(GOODBYE_PROMPT.to_string(), message).await,
                kind: ResponseKind::Goodbye,
            },
            Intent::OffTopic => RouteOutcome::Reply {
                text: self.generate(OFF_TOPIC_PROMPT.to_string(), message).await,
                kind: ResponseKind::General,
            },
            Intent::NewRequirement => {
                session.begin_requirement(message);
                RouteOutcome::Proceed(ProceedAction {
                    requirement: message.to_string(),
                    is_new: true,
                    offered_model: None,
                    notice: NEW_REQUIREMENT_NOTICE.to_string(),
                })
            }
            Intent::FollowUp => match session.current_model.clone() {
                Some(model) => RouteOutcome::Reply {
                    text: self
                        .generate(follow_up_prompt(&model, history), message)
                        .await,
                    kind: ResponseKind::FollowUp,
                },
                None => RouteOutcome::Reply {
                    text: NO_MODEL_YET.to_string(),
                    kind: ResponseKind::General,
                },
            },
            Intent::ModelRejection => self.handle_rejection(session).await,
        }
    }

    /// Rejection drains the shortlist head-first; only an exhausted pool
    /// re-queries the pipeline, carrying the original requirement forward
    async fn handle_rejection(&self, session: &mut Session) -> RouteOutcome {
        session.reject_current();

        let requirement = session.original_requirement.clone();
        let next = session
            .remaining_candidates()
            .first()
            .map(|m| m.to_string());

        match next {
            None => {
                session.is_new_requirement = false;
                RouteOutcome::Proceed(ProceedAction {
                    requirement,
                    is_new: false,
                    offered_model: None,
                    notice: EXHAUSTED_NOTICE.to_string(),
                })
            }
            Some(key) => {
                let full_name = self.resolve_display_name(&key).await;
                session.offer(full_name.clone());
                RouteOutcome::Proceed(ProceedAction {
                    requirement,
                    is_new: false,
                    offered_model: Some(full_name.clone()),
                    notice: format!(
                        "I understand! Let me recommend {full_name} as a better alternative for your needs."
                    ),
                })
            }
        }
    }

    async fn resolve_display_name(&self, key: &str) -> String {
        match self.catalog.display_name(key).await {
            Ok(Some(name)) => name,
            Ok(None) => key.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, key, "catalog lookup failed, using shortlist key");
                key.to_string()
            }
        }
    }

    async fn generate(&self, system_prompt: String, message: &str) -> String {
        match self
            .completion
            .complete(&system_prompt, message, self.temperature, self.max_tokens)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "reply generation failed, using fixed apology");
                GENERATION_APOLOGY.to_string()
            }
        }
    }
}

const GREETING_PROMPT: &str = "You are a friendly AI model advisor. Generate a warm, welcoming greeting that:
- Is brief and conversational (1-2 sentences max)
- Asks about their AI needs
- Uses simple, friendly language
- Sounds natural and engaging

Do NOT use any markdown formatting, ** symbols, or ## symbols.
Keep it clean and simple.";

const GOODBYE_PROMPT: &str = "Generate a friendly goodbye message that:
- Is warm and positive
- Invites them to return
- Is brief (1-2 sentences)
- Sounds natural

Do NOT use any markdown formatting or special symbols.";

const OFF_TOPIC_PROMPT: &str = "The user asked something unrelated to AI models.
Generate a polite redirect that:
- Is friendly but firm
- Redirects to AI model topics
- Is brief (1 sentence)
- Sounds natural

Do NOT use any markdown formatting or special symbols.";

fn follow_up_prompt(current_model: &str, history: &[TurnRecord]) -> String {
    format!(
        "You are helping a user with the AI model: {model}

RECENT CHAT HISTORY:
{history}

Generate a helpful response that:
- Answers their question about {model}
- Uses clear, simple language
- Provides practical information
- Adapts response style based on question complexity

FORMATTING GUIDELINES:
- For short questions give a brief paragraph answer (2-3 sentences)
- For complex questions structure with an intro paragraph plus key points
- For main features/points use bullet points (\u{2022})
- For steps/processes use numbers (1. 2. 3.)
- Always mention the model name: {model}
- Do NOT use ** or ## symbols

Make it conversational, helpful, and visually appealing.",
        model = current_model,
        history = render_history(history),
    )
}

/// Catalog-backed detail block for an offered model, appended to the
/// offer notice by the turn orchestrator
pub async fn model_info_block(
    catalog: &dyn CatalogRepository,
    model_name: &str,
) -> AppResult<Option<String>> {
    let entry = catalog
        .all_models()
        .await?
        .into_iter()
        .find(|e| e.name == model_name || e.key == model_name);

    Ok(entry.map(|e| {
        format!(
            "Speed    : {}\nAccuracy : {}\nPricing  : {}\nCloud    : {}\nRegion   : {}",
            e.speed.as_deref().unwrap_or("Unknown"),
            e.accuracy.as_deref().unwrap_or("Unknown"),
            e.pricing.as_deref().unwrap_or("Unknown"),
            e.cloud.as_deref().unwrap_or("Unknown"),
            e.region.as_deref().unwrap_or("Unknown"),
        )
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::store::{CatalogEntry, MockCatalogRepository};
    use async_trait::async_trait;

    struct FixedCompletion(Option<String>);

    #[async_trait]
    impl CompletionService for FixedCompletion {
        async fn complete(
            &self,
            _system: &str,
            _user: &str,
            _temperature: f64,
            _max_tokens: u32,
        ) -> AppResult<String> {
            self.0.clone().ok_or(AppError::Completion {
                endpoint: "mock".to_string(),
                reason: "mock failure".to_string(),
            })
        }
    }

    fn router_with(
        completion: FixedCompletion,
        catalog: MockCatalogRepository,
    ) -> ConversationRouter {
        ConversationRouter::new(Arc::new(completion), Arc::new(catalog), 0.7, 500)
    }

    fn empty_catalog() -> MockCatalogRepository {
        MockCatalogRepository::new()
    }

    #[tokio::test]
    async fn test_greeting_replies_without_proceeding() {
        let router = router_with(
            FixedCompletion(Some("Hello! What AI task can I help with?".into())),
            empty_catalog(),
        );
        let mut session = Session::default();
        let outcome = router
            .handle(Intent::Greeting, "hi", &mut session, &[])
            .await;
        assert_eq!(
            outcome,
            RouteOutcome::Reply {
                text: "Hello! What AI task can I help with?".into(),
                kind: ResponseKind::Greeting,
            }
        );
        assert_eq!(session, Session::default());
    }

    #[tokio::test]
    async fn test_generation_failure_degrades_to_apology() {
        let router = router_with(FixedCompletion(None), empty_catalog());
        let mut session = Session::default();
        let outcome = router
            .handle(Intent::Goodbye, "bye", &mut session, &[])
            .await;
        match outcome {
            RouteOutcome::Reply { text, .. } => assert_eq!(text, GENERATION_APOLOGY),
            other => panic!("expected reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_new_requirement_proceeds_with_verbatim_message() {
        let router = router_with(FixedCompletion(None), empty_catalog());
        let mut session = Session::default();
        let message = "I need a model for  speech  transcription";
        let outcome = router
            .handle(Intent::NewRequirement, message, &mut session, &[])
            .await;
        match outcome {
            RouteOutcome::Proceed(action) => {
                assert_eq!(action.requirement, message);
                assert!(action.is_new);
                assert!(action.offered_model.is_none());
            }
            other => panic!("expected proceed, got {other:?}"),
        }
        assert_eq!(session.original_requirement, message);
        assert!(session.is_new_requirement);
    }

    #[tokio::test]
    async fn test_follow_up_without_model_never_proceeds() {
        let router = router_with(
            FixedCompletion(Some("should not be used".into())),
            empty_catalog(),
        );
        let mut session = Session::default();
        let outcome = router
            .handle(Intent::FollowUp, "is it fast?", &mut session, &[])
            .await;
        assert_eq!(
            outcome,
            RouteOutcome::Reply {
                text: NO_MODEL_YET.to_string(),
                kind: ResponseKind::General,
            }
        );
    }

    #[tokio::test]
    async fn test_follow_up_with_model_answers_read_only() {
        let router = router_with(
            FixedCompletion(Some("GPT-4o handles images well.".into())),
            empty_catalog(),
        );
        let mut session = Session {
            current_model: Some("GPT-4o".into()),
            ..Session::default()
        };
        let before = session.clone();
        let history = vec![TurnRecord::for_test("u", "recommend something", "GPT-4o")];
        let outcome = router
            .handle(Intent::FollowUp, "does it do images?", &mut session, &history)
            .await;
        match outcome {
            RouteOutcome::Reply { text, kind } => {
                assert_eq!(text, "GPT-4o handles images well.");
                assert_eq!(kind, ResponseKind::FollowUp);
            }
            other => panic!("expected reply, got {other:?}"),
        }
        assert_eq!(session, before, "follow-up must not mutate the session");
    }

    #[tokio::test]
    async fn test_rejection_offers_next_candidate() {
        let mut catalog = MockCatalogRepository::new();
        catalog
            .expect_display_name()
            .withf(|key| key == "b")
            .returning(|_| Ok(Some("Model B (Full Name)".to_string())));
        let router = router_with(FixedCompletion(None), catalog);

        let mut session = Session {
            shortlisted_models: vec!["a".into(), "b".into(), "c".into()],
            current_model: Some("a".into()),
            original_requirement: "ocr task".into(),
            ..Session::default()
        };
        let outcome = router
            .handle(Intent::ModelRejection, "suggest another", &mut session, &[])
            .await;

        assert_eq!(session.rejected_models, vec!["a".to_string()]);
        assert_eq!(session.current_model.as_deref(), Some("Model B (Full Name)"));
        assert!(!session.is_new_requirement);
        match outcome {
            RouteOutcome::Proceed(action) => {
                assert_eq!(action.offered_model.as_deref(), Some("Model B (Full Name)"));
                assert!(!action.is_new);
                assert!(action.notice.contains("Model B (Full Name)"));
                assert_eq!(action.requirement, "ocr task");
            }
            other => panic!("expected proceed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejection_of_last_candidate_requeries_pipeline() {
        let router = router_with(FixedCompletion(None), empty_catalog());
        let mut session = Session {
            shortlisted_models: vec!["a".into()],
            current_model: Some("a".into()),
            original_requirement: "summarize legal contracts".into(),
            is_new_requirement: true,
            ..Session::default()
        };
        let outcome = router
            .handle(Intent::ModelRejection, "no", &mut session, &[])
            .await;

        assert!(session.remaining_candidates().is_empty());
        assert!(!session.is_new_requirement);
        match outcome {
            RouteOutcome::Proceed(action) => {
                assert!(!action.is_new);
                assert!(action.offered_model.is_none());
                // The original requirement is carried forward verbatim
                assert_eq!(action.requirement, "summarize legal contracts");
            }
            other => panic!("expected proceed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejection_without_current_model_still_drains() {
        let router = router_with(FixedCompletion(None), empty_catalog());
        let mut session = Session {
            original_requirement: "chatbot backend".into(),
            ..Session::default()
        };
        let outcome = router
            .handle(Intent::ModelRejection, "something else", &mut session, &[])
            .await;
        assert!(session.rejected_models.is_empty());
        match outcome {
            RouteOutcome::Proceed(action) => {
                assert!(action.offered_model.is_none());
                assert_eq!(action.requirement, "chatbot backend");
            }
            other => panic!("expected proceed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejected_model_never_reoffered() {
        let mut catalog = MockCatalogRepository::new();
        catalog.expect_display_name().returning(|key| Ok(Some(key.to_string())));
        let router = router_with(FixedCompletion(None), catalog);

        let mut session = Session {
            shortlisted_models: vec!["a".into(), "b".into()],
            current_model: Some("a".into()),
            original_requirement: "r".into(),
            ..Session::default()
        };

        router
            .handle(Intent::ModelRejection, "no", &mut session, &[])
            .await;
        assert_eq!(session.current_model.as_deref(), Some("b"));

        router
            .handle(Intent::ModelRejection, "no", &mut session, &[])
            .await;
        // Both candidates rejected, nothing left to offer
        assert!(session.current_model.is_none());
        assert!(session.remaining_candidates().is_empty());
        assert_eq!(session.rejected_models, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_catalog_failure_falls_back_to_key() {
        let mut catalog = MockCatalogRepository::new();
        catalog
            .expect_display_name()
            .returning(|_| Err(AppError::Persistence("down".into())));
        let router = router_with(FixedCompletion(None), catalog);

        let mut session = Session {
            shortlisted_models: vec!["a".into(), "b".into()],
            current_model: Some("a".into()),
            ..Session::default()
        };
        let outcome = router
            .handle(Intent::ModelRejection, "no", &mut session, &[])
            .await;
        match outcome {
            RouteOutcome::Proceed(action) => {
                assert_eq!(action.offered_model.as_deref(), Some("b"));
            }
            other => panic!("expected proceed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_model_info_block_formats_catalog_entry() {
        let mut catalog = MockCatalogRepository::new();
        catalog.expect_all_models().returning(|| {
            Ok(vec![CatalogEntry {
                key: "gpt-4o".into(),
                name: "GPT-4o".into(),
                speed: Some("Fast".into()),
                accuracy: Some("97%".into()),
                pricing: Some("$5/1M tokens".into()),
                cloud: Some("Azure".into()),
                region: Some("East US".into()),
                ..CatalogEntry::default()
            }])
        });
        let info = model_info_block(&catalog, "GPT-4o").await.unwrap().unwrap();
        assert!(info.contains("Speed    : Fast"));
        assert!(info.contains("Region   : East US"));
    }

    #[tokio::test]
    async fn test_model_info_block_unknown_model_is_none() {
        let mut catalog = MockCatalogRepository::new();
        catalog.expect_all_models().returning(|| Ok(vec![]));
        assert!(model_info_block(&catalog, "nope").await.unwrap().is_none());
    }
}
