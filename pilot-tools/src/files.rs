//! The two file-mutating tools. Both confirm through the
//! [`ConfirmationMediator`] with their serialized arguments, so scoped write
//! grants (matched against `"file_path":"..."`) apply to them directly.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use pilot_security::{
    ArgsPattern, Confirmation, ConfirmationMediator, ConfirmationOutcome, ConfirmationRequest,
    ConfirmationTicket, Decision, PolicyRule, SecurityError,
};

use crate::invocation::{ToolErrorKind, ToolInvocation, ToolOutcome};

pub const WRITE_FILE: &str = "write_file";
pub const EDIT_FILE: &str = "edit_file";

/// Resolve a `ProceedAlways` outcome by appending a standing allow rule for
/// the tool, so later invocations skip the prompt.
fn promote_allow_always(mediator: &ConfirmationMediator, tool_name: &str) {
    let mut rule = PolicyRule::new(tool_name, ArgsPattern::Any, Decision::Allow);
    rule.source = "confirmation".to_string();
    mediator.store().add_rule(rule);
    tracing::debug!(tool_name, "allow-always rule added after confirmation");
}

fn serialize_args<T: Serialize>(args: &T) -> pilot_security::Result<String> {
    serde_json::to_string(args).map_err(|e| SecurityError::Other(e.to_string()))
}

// ---------------------------------------------------------------------------
// write_file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteFileParams {
    pub file_path: String,
    pub content: String,
}

/// Writes (or overwrites) one file.
pub struct WriteFileTool {
    mediator: ConfirmationMediator,
    params: WriteFileParams,
    ticket: Option<ConfirmationTicket>,
}

impl WriteFileTool {
    pub fn new(mediator: ConfirmationMediator, params: WriteFileParams) -> Self {
        Self {
            mediator,
            params,
            ticket: None,
        }
    }
}

#[async_trait]
impl ToolInvocation for WriteFileTool {
    fn name(&self) -> &str {
        WRITE_FILE
    }

    async fn should_confirm_execute(
        &mut self,
        _cancel: &CancellationToken,
    ) -> pilot_security::Result<Option<ConfirmationRequest>> {
        let serialized = serialize_args(&self.params)?;
        let prompt = format!(
            "Write {} bytes to {}",
            self.params.content.len(),
            self.params.file_path
        );
        match self
            .mediator
            .confirm(WRITE_FILE, &serialized, "Write file", &prompt)?
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
                    return ToolOutcome::cancelled("write cancelled; nothing was written");
                }
                ConfirmationOutcome::ProceedAlways => {
                    promote_allow_always(&self.mediator, WRITE_FILE);
                }
                ConfirmationOutcome::Proceed => {}
            }
        }
        if cancel.is_cancelled() {
            return ToolOutcome::cancelled("write cancelled; nothing was written");
        }

        if let Some(parent) = Path::new(&self.params.file_path).parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(err) = tokio::fs::create_dir_all(parent).await {
                    return ToolOutcome::failed(ToolErrorKind::Io, err.to_string());
                }
            }
        }
        match tokio::fs::write(&self.params.file_path, &self.params.content).await {
            Ok(()) => ToolOutcome::success(
                format!(
                    "wrote {} bytes to {}",
                    self.params.content.len(),
                    self.params.file_path
                ),
                format!("Wrote {}", self.params.file_path),
            ),
            Err(err) => ToolOutcome::failed(ToolErrorKind::Io, err.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// edit_file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditFileParams {
    pub file_path: String,
    pub old_text: String,
    pub new_text: String,
}

/// Replaces the first occurrence of `old_text` in one file.
pub struct EditFileTool {
    mediator: ConfirmationMediator,
    params: EditFileParams,
    ticket: Option<ConfirmationTicket>,
}

impl EditFileTool {
    pub fn new(mediator: ConfirmationMediator, params: EditFileParams) -> Self {
        Self {
            mediator,
            params,
            ticket: None,
        }
    }
}

#[async_trait]
impl ToolInvocation for EditFileTool {
    fn name(&self) -> &str {
        EDIT_FILE
    }

    async fn should_confirm_execute(
        &mut self,
        _cancel: &CancellationToken,
    ) -> pilot_security::Result<Option<ConfirmationRequest>> {
        let serialized = serialize_args(&self.params)?;
        let prompt = format!("Edit {}", self.params.file_path);
        match self
            .mediator
            .confirm(EDIT_FILE, &serialized, "Edit file", &prompt)?
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
                    return ToolOutcome::cancelled("edit cancelled; file unchanged");
                }
                ConfirmationOutcome::ProceedAlways => {
                    promote_allow_always(&self.mediator, EDIT_FILE);
                }
                ConfirmationOutcome::Proceed => {}
            }
        }
        if cancel.is_cancelled() {
            return ToolOutcome::cancelled("edit cancelled; file unchanged");
        }

        let current = match tokio::fs::read_to_string(&self.params.file_path).await {
            Ok(text) => text,
            Err(err) => return ToolOutcome::failed(ToolErrorKind::Io, err.to_string()),
        };
        if !current.contains(&self.params.old_text) {
            return ToolOutcome::failed(
                ToolErrorKind::InvalidParams,
                format!("old_text not found in {}", self.params.file_path),
            );
        }
        let updated = current.replacen(&self.params.old_text, &self.params.new_text, 1);
        match tokio::fs::write(&self.params.file_path, updated).await {
            Ok(()) => ToolOutcome::success(
                format!("edited {}", self.params.file_path),
                format!("Edited {}", self.params.file_path),
            ),
            Err(err) => ToolOutcome::failed(ToolErrorKind::Io, err.to_string()),
        }
    }
}
