//! The tool invocation contract.
//!
//! Every side-effecting tool runs in two steps: `should_confirm_execute`
//! consults policy (returning a pending confirmation request when a human
//! decision is needed, or a policy-denial error that must prevent execution
//! entirely), then `execute` performs the action. A cancelled confirmation
//! short-circuits `execute` with a structured cancellation outcome — never an
//! error, and always with zero side effects.

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use pilot_security::ConfirmationRequest;

/// Why a tool invocation did not produce its effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// The confirmation was cancelled. Not a failure; nothing happened.
    Cancelled,
    /// The path-sandbox collaborator rejected the target path.
    PathRejected,
    /// Malformed or missing parameters.
    InvalidParams,
    /// Filesystem or other IO failure during execution.
    Io,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
}

/// Result of one tool execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// Machine-facing result content (fed back to the model).
    pub content: String,
    /// Human-facing display string.
    pub display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

impl ToolOutcome {
    pub fn success(content: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            display: display.into(),
            error: None,
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            content: message.clone(),
            display: message.clone(),
            error: Some(ToolError {
                kind: ToolErrorKind::Cancelled,
                message,
            }),
        }
    }

    pub fn failed(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            content: message.clone(),
            display: message.clone(),
            error: Some(ToolError { kind, message }),
        }
    }

    /// Distinguishes a cancelled invocation from both success and failure.
    pub fn is_cancelled(&self) -> bool {
        self.error
            .as_ref()
            .is_some_and(|e| e.kind == ToolErrorKind::Cancelled)
    }

    pub fn is_error(&self) -> bool {
        self.error
            .as_ref()
            .is_some_and(|e| e.kind != ToolErrorKind::Cancelled)
    }
}

/// A two-step, policy-gated tool invocation.
#[async_trait]
pub trait ToolInvocation: Send + Sync {
    fn name(&self) -> &str;

    /// Consult policy for this invocation.
    ///
    /// `Ok(None)`: no prompt needed, execution may proceed.
    /// `Ok(Some(request))`: surface the request to the human; `execute` will
    /// observe the outcome. `Err(PolicyDenied)`: execution must never run.
    async fn should_confirm_execute(
        &mut self,
        cancel: &CancellationToken,
    ) -> pilot_security::Result<Option<ConfirmationRequest>>;

    /// Perform the action. Must detect a cancelled confirmation and
    /// short-circuit with [`ToolOutcome::cancelled`], performing no side
    /// effect.
    async fn execute(&mut self, cancel: &CancellationToken) -> ToolOutcome;
}
