//! Confirmation protocol: turns an `AskUser` decision into a resolvable human
//! decision with guaranteed no-side-effect-on-cancel semantics.
//!
//! The state machine is `INIT -> {EXECUTABLE | DENIED | PENDING}`;
//! `PENDING --Proceed/ProceedAlways--> CONFIRMED -> EXECUTABLE`;
//! `PENDING --Cancel--> CANCELLED` (terminal). The outcome is produced exactly
//! once: the host resolves a [`ConfirmationResolver`] (consumed on resolve)
//! and the executing tool observes it through a [`ConfirmationTicket`].

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, SecurityError};
use crate::rules::{Decision, ModeState, PolicyStore};

/// Terminal outcome of a pending confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationOutcome {
    /// Run this invocation.
    Proceed,
    /// Run this invocation and stop prompting for this tool.
    ProceedAlways,
    /// Do not run; the invocation must produce no side effect.
    Cancel,
}

/// Consume-once handle the host uses to resolve a pending confirmation.
///
/// Taking `self` by value makes double resolution unrepresentable; dropping
/// the resolver unresolved reads as a cancellation on the ticket side.
#[derive(Debug)]
pub struct ConfirmationResolver {
    tx: oneshot::Sender<ConfirmationOutcome>,
}

impl ConfirmationResolver {
    pub fn resolve(self, outcome: ConfirmationOutcome) {
        // The ticket may already have been dropped (task torn down); that is
        // not an error the host can act on.
        let _ = self.tx.send(outcome);
    }
}

/// Structured request surfaced to the human for a pending confirmation.
#[derive(Debug)]
pub struct ConfirmationRequest {
    /// Short title for the prompt dialog.
    pub title: String,
    /// Human-readable description of what will happen on proceed.
    pub prompt: String,
    /// Handle that resolves this confirmation. Consumed on use.
    pub resolver: ConfirmationResolver,
}

/// Execute-side receiver for the resolved outcome of a pending confirmation.
#[derive(Debug)]
pub struct ConfirmationTicket {
    rx: oneshot::Receiver<ConfirmationOutcome>,
}

impl ConfirmationTicket {
    /// Wait for the human decision, racing the abort signal.
    ///
    /// A fired abort signal, or a resolver dropped unresolved, yields
    /// [`ConfirmationOutcome::Cancel`]. Cancellation wins even when it lands
    /// after the user nominally confirmed: the caller must observe `Cancel`
    /// and perform no side effect.
    pub async fn outcome(self, cancel: &CancellationToken) -> ConfirmationOutcome {
        let outcome = tokio::select! {
            _ = cancel.cancelled() => ConfirmationOutcome::Cancel,
            resolved = self.rx => resolved.unwrap_or(ConfirmationOutcome::Cancel),
        };
        if cancel.is_cancelled() {
            ConfirmationOutcome::Cancel
        } else {
            outcome
        }
    }
}

/// Result of the confirm step for one proposed invocation.
#[derive(Debug)]
pub enum Confirmation {
    /// Policy allowed the call outright; no prompt needed.
    Executable,
    /// A human decision is required before execution. The request goes to the
    /// host; the ticket stays with the tool for its execute step.
    Pending {
        request: ConfirmationRequest,
        ticket: ConfirmationTicket,
    },
}

/// Mediates between [`PolicyStore`] decisions and the tool invocation
/// contract.
#[derive(Debug, Clone)]
pub struct ConfirmationMediator {
    store: Arc<PolicyStore>,
    mode: Arc<ModeState>,
}

impl ConfirmationMediator {
    pub fn new(store: Arc<PolicyStore>, mode: Arc<ModeState>) -> Self {
        Self { store, mode }
    }

    pub fn store(&self) -> &Arc<PolicyStore> {
        &self.store
    }

    pub fn mode(&self) -> &Arc<ModeState> {
        &self.mode
    }

    /// Consult policy for a proposed call.
    ///
    /// `Deny` fails here, before any state change; callers must never reach
    /// their execute step. `Allow` needs no prompt. `AskUser` produces a
    /// pending request/ticket pair.
    pub fn confirm(
        &self,
        tool_name: &str,
        serialized_args: &str,
        title: &str,
        prompt: &str,
    ) -> Result<Confirmation> {
        match self
            .store
            .evaluate(tool_name, serialized_args, self.mode.current())
        {
            Decision::Allow => Ok(Confirmation::Executable),
            Decision::Deny => Err(SecurityError::PolicyDenied {
                tool_name: tool_name.to_string(),
                reason: "denied by policy rule".to_string(),
            }),
            Decision::AskUser => {
                let (tx, rx) = oneshot::channel();
                Ok(Confirmation::Pending {
                    request: ConfirmationRequest {
                        title: title.to_string(),
                        prompt: prompt.to_string(),
                        resolver: ConfirmationResolver { tx },
                    },
                    ticket: ConfirmationTicket { rx },
                })
            }
        }
    }
}
