//! Per-user conversation session state
//!
//! A session carries the active shortlist, the model currently under
//! discussion, and the models the user has declined. It is loaded at the
//! start of every turn, mutated in place by the conversation router, and
//! written back when the turn completes. Expiry is handled by the store
//! (TTL on the session document); there is no explicit destruction here.

use serde::{Deserialize, Serialize};

/// Ephemeral conversation state for one user
///
/// Invariant: the current model is never simultaneously the active
/// suggestion and a member of `rejected_models`. Rejection always removes
/// it from consideration before a new current model is chosen (see
/// [`Session::reject_current`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Candidate models from the latest pipeline run, most recent first
    #[serde(default)]
    pub shortlisted_models: Vec<String>,
    /// Model currently offered to the user, if any
    #[serde(default)]
    pub current_model: Option<String>,
    /// Models the user has explicitly declined, in rejection order
    #[serde(default)]
    pub rejected_models: Vec<String>,
    /// Free-text requirement that produced the current shortlist, verbatim
    #[serde(default)]
    pub original_requirement: String,
    /// Distinguishes "start fresh" from "keep narrowing the shortlist"
    #[serde(default)]
    pub is_new_requirement: bool,
}

impl Session {
    /// Shortlist minus rejected models, shortlist order preserved
    pub fn remaining_candidates(&self) -> Vec<&str> {
        self.shortlisted_models
            .iter()
            .filter(|m| !self.rejected_models.contains(m))
            .map(String::as_str)
            .collect()
    }

    /// Record the user's rejection of the current model
    ///
    /// Moves `current_model` into `rejected_models` (without duplicating)
    /// and clears the active suggestion. No-op when nothing is offered.
    pub fn reject_current(&mut self) -> Option<String> {
        let rejected = self.current_model.take()?;
        if !self.rejected_models.contains(&rejected) {
            self.rejected_models.push(rejected.clone());
        }
        Some(rejected)
    }

    /// Start a fresh requirement, keeping the message text verbatim
    pub fn begin_requirement(&mut self, message: &str) {
        self.original_requirement = message.to_string();
        self.is_new_requirement = true;
    }

    /// Install a freshly recommended shortlist
    ///
    /// The head of the shortlist becomes the current model. A new
    /// requirement clears earlier rejections; a re-query after shortlist
    /// exhaustion keeps them so drained candidates are not re-offered.
    pub fn adopt_shortlist(&mut self, models: Vec<String>) {
        self.current_model = models.first().cloned();
        self.shortlisted_models = models;
        if self.is_new_requirement {
            self.rejected_models.clear();
        }
    }

    /// Promote a remaining candidate to the active suggestion
    pub fn offer(&mut self, model: String) {
        debug_assert!(!self.rejected_models.contains(&model));
        self.current_model = Some(model);
        self.is_new_requirement = false;
    }
}
