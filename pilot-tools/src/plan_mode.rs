//! The mode-switch tool: enters plan mode, optionally granting scoped write
//! access to one path for the file-mutating tools.
//!
//! Order matters and is load-bearing: resolve path -> external validation ->
//! rule injection -> mode switch. A validation failure or a cancelled
//! confirmation leaves the process in its previous mode with no rules
//! injected.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use pilot_security::{
    Confirmation, ConfirmationMediator, ConfirmationOutcome, ConfirmationRequest,
    ConfirmationTicket, DEFAULT_WRITE_TOOLS, Mode, PathAccessValidator, SecurityError,
    grant_scoped_write,
};

use crate::invocation::{ToolErrorKind, ToolInvocation, ToolOutcome};

pub const ENTER_PLAN_MODE: &str = "enter_plan_mode";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanModeParams {
    /// Directory (or file) the plan is allowed to write to. No grant is
    /// injected when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Tools covered by the grant. Defaults to the two file-mutating tools.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
}

/// Switches the process into plan mode after injecting the scoped write
/// grant.
pub struct EnterPlanModeTool {
    mediator: ConfirmationMediator,
    validator: Arc<dyn PathAccessValidator>,
    base_dir: PathBuf,
    params: PlanModeParams,
    ticket: Option<ConfirmationTicket>,
}

impl EnterPlanModeTool {
    pub fn new(
        mediator: ConfirmationMediator,
        validator: Arc<dyn PathAccessValidator>,
        base_dir: PathBuf,
        params: PlanModeParams,
    ) -> Self {
        Self {
            mediator,
            validator,
            base_dir,
            params,
            ticket: None,
        }
    }
}

#[async_trait]
impl ToolInvocation for EnterPlanModeTool {
    fn name(&self) -> &str {
        ENTER_PLAN_MODE
    }

    async fn should_confirm_execute(
        &mut self,
        _cancel: &CancellationToken,
    ) -> pilot_security::Result<Option<ConfirmationRequest>> {
        let serialized =
            serde_json::to_string(&self.params).map_err(|e| SecurityError::Other(e.to_string()))?;
        let prompt = match &self.params.path {
            Some(path) => format!("Enter plan mode with write access to '{path}'"),
            None => "Enter plan mode (read-only)".to_string(),
        };
        match self
            .mediator
            .confirm(ENTER_PLAN_MODE, &serialized, "Enter plan mode", &prompt)?
        {
            Confirmation::Executable => Ok(None),
            Confirmation::Pending { request, ticket } => {
                self.ticket = Some(ticket);
                Ok(Some(request))
            }
        }
    }

    async fn execute(&mut self, cancel: &CancellationToken) -> ToolOutcome {
        if let Some(ticket) = self.ticket.take() {
            match ticket.outcome(cancel).await {
                ConfirmationOutcome::Cancel => {
                    return ToolOutcome::cancelled("plan mode cancelled; mode unchanged");
                }
                // Proceed and ProceedAlways both authorize this switch; a
                // standing allow rule for mode switches is not promoted.
                ConfirmationOutcome::Proceed | ConfirmationOutcome::ProceedAlways => {}
            }
        }
        if cancel.is_cancelled() {
            return ToolOutcome::cancelled("plan mode cancelled; mode unchanged");
        }

        if let Some(path) = &self.params.path {
            let tools: Vec<String> = self
                .params
                .tools
                .clone()
                .unwrap_or_else(|| DEFAULT_WRITE_TOOLS.iter().map(|t| t.to_string()).collect());
            match grant_scoped_write(
                self.mediator.store(),
                self.validator.as_ref(),
                &self.base_dir,
                path,
                &tools,
                Mode::Plan,
                ENTER_PLAN_MODE,
            ) {
                Ok(_ids) => {}
                Err(SecurityError::PathRejected(message)) => {
                    // Structured error, no injection, no mode switch: the
                    // agent can pick a different path within its turns.
                    return ToolOutcome::failed(ToolErrorKind::PathRejected, message);
                }
                Err(err) => {
                    return ToolOutcome::failed(ToolErrorKind::Io, err.to_string());
                }
            }
        }

        // The switch happens only after successful injection.
        let previous = self.mediator.mode().switch(Mode::Plan);
        tracing::debug!(?previous, "entered plan mode");
        ToolOutcome::success(
            match &self.params.path {
                Some(path) => format!("entered plan mode with write access to {path}"),
                None => "entered plan mode".to_string(),
            },
            "Entered plan mode".to_string(),
        )
    }
}
