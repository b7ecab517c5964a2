//! The generative-model exchange interface.
//!
//! The model client is an external collaborator: the loop hands it the
//! conversation so far (including the latest page snapshot) and receives
//! either final text or the next action to attempt.

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use pilot_browser::{ActionOutcome, Snapshot};

use crate::error::Result;

/// One item of the conversation fed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversationItem {
    /// The user's task statement.
    Task { text: String },
    /// Page state captured after the previous action.
    Page { snapshot: Snapshot },
    /// An action the model requested, and what happened.
    Action {
        name: String,
        args: serde_json::Value,
        outcome: ActionOutcome,
    },
    /// Guard or overlay advisory fed back to the model.
    Advisory { text: String },
    /// Final model text.
    Text { text: String },
}

/// What the model wants to do next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelStep {
    /// Final answer; the task is complete.
    Text { text: String },
    /// Invoke a named browser action with JSON arguments.
    Action {
        name: String,
        args: serde_json::Value,
    },
}

/// Request/response exchange with the generative model.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn next_step(&self, conversation: &[ConversationItem]) -> Result<ModelStep>;
}
