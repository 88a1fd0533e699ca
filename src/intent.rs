//! Intent classification for inbound messages
//!
//! The classifier delegates the actual decision to the completion service
//! and reduces its text output to a closed [`Intent`] enum. Classification
//! failures never propagate: the conversation must always produce some
//! user-visible reply, so a failed or unparseable classification degrades
//! to [`Intent::OffTopic`] and the router answers with a redirect.

use crate::llm::CompletionService;
use crate::store::TurnRecord;
use std::str::FromStr;
use std::sync::Arc;

/// Number of history turns offered to the classifier as context
pub const HISTORY_WINDOW: usize = 10;

/// Sampling temperature for classification (deterministic)
const CLASSIFY_TEMPERATURE: f64 = 0.0;

/// Token budget for the classification reply; the expected output is a
/// single label, the headroom tolerates chatty models
const CLASSIFY_MAX_TOKENS: u32 = 16;

/// The classified purpose of a user message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Greeting,
    NewRequirement,
    FollowUp,
    ModelRejection,
    Goodbye,
    OffTopic,
}

impl Intent {
    /// Canonical label, also used as a metrics dimension
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "Greeting",
            Intent::NewRequirement => "NewRequirement",
            Intent::FollowUp => "FollowUp",
            Intent::ModelRejection => "ModelRejection",
            Intent::Goodbye => "Goodbye",
            Intent::OffTopic => "OffTopic",
        }
    }

    const ALL: [Intent; 6] = [
        Intent::Greeting,
        Intent::NewRequirement,
        Intent::FollowUp,
        Intent::ModelRejection,
        Intent::Goodbye,
        Intent::OffTopic,
    ];
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse an intent label out of a completion response
///
/// Exact label match first; otherwise a case-insensitive scan of the text,
/// so verbose responses like "The message is a Greeting." still resolve.
impl FromStr for Intent {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        for intent in Intent::ALL {
            if trimmed.eq_ignore_ascii_case(intent.as_str()) {
                return Ok(intent);
            }
        }
        let lowered = trimmed.to_lowercase();
        for intent in Intent::ALL {
            if lowered.contains(&intent.as_str().to_lowercase()) {
                return Ok(intent);
            }
        }
        Err(())
    }
}

/// LLM-backed message classifier
pub struct IntentClassifier {
    completion: Arc<dyn CompletionService>,
}

impl IntentClassifier {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }

    /// Classify a message given recent history and the model under discussion
    ///
    /// Infallible by design: any completion failure or unparseable output
    /// resolves to `OffTopic` so the turn still produces a reply.
    pub async fn classify(
        &self,
        message: &str,
        history: &[TurnRecord],
        current_model: Option<&str>,
    ) -> Intent {
        let system_prompt = classification_prompt(history, current_model, message);

        match self
            .completion
            .complete(
                &system_prompt,
                message.trim(),
                CLASSIFY_TEMPERATURE,
                CLASSIFY_MAX_TOKENS,
            )
            .await
        {
            Ok(text) => match text.parse::<Intent>() {
                Ok(intent) => {
                    tracing::debug!(%intent, "classified message");
                    intent
                }
                Err(()) => {
                    tracing::warn!(response = %text, "unparseable classification, defaulting to OffTopic");
                    Intent::OffTopic
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "classification call failed, defaulting to OffTopic");
                Intent::OffTopic
            }
        }
    }
}

/// Render recent turns as alternating User/Agent lines, oldest first
pub fn render_history(history: &[TurnRecord]) -> String {
    let mut lines = Vec::with_capacity(history.len() * 2);
    for turn in history {
        lines.push(format!("User: {}", turn.message));
        lines.push(format!("Agent: {}", turn.response));
    }
    lines.join("\n")
}

fn classification_prompt(
    history: &[TurnRecord],
    current_model: Option<&str>,
    message: &str,
) -> String {
    let window_start = history.len().saturating_sub(HISTORY_WINDOW);
    format!(
        r#"You are classifying user messages in an AI model recommendation chatbot.

CHAT HISTORY:
{history}

CURRENT MODEL: {model}

USER'S LATEST MESSAGE: {message}

Classify the user's message into one of these categories:

1. Greeting - Simple greetings like "hi", "hello", "good morning"
2. NewRequirement - User wants recommendation for a NEW AI task/use-case
3. FollowUp - User is asking about the CURRENT recommended model (includes yes/no responses to agent questions)
4. ModelRejection - User explicitly rejects the current model and wants alternatives
5. Goodbye - Messages like "bye", "good night", "see you", "talk later"
6. OffTopic - Questions completely unrelated to AI models (math, weather, personal advice, etc.)

IMPORTANT RULES:
- If user says "yes", "ok", "sure", "no", "not really" after agent asked about current model -> FollowUp
- If user asks details about current model -> FollowUp
- If user describes a completely new AI task -> NewRequirement
- If user says "I don't like this model" or "suggest another" -> ModelRejection
- Only classify as OffTopic if completely unrelated to AI models AND not a continuation of current conversation

Reply with ONLY one word: Greeting, NewRequirement, FollowUp, ModelRejection, Goodbye, or OffTopic"#,
        history = render_history(&history[window_start..]),
        model = current_model.unwrap_or("None"),
        message = message,
    )
}
