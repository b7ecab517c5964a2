use pilot_browser::BrowserError;

/// Errors produced by the agent loop and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The model client itself failed. Not recoverable within the turn
    /// budget; the loop reports `Failed`.
    #[error("model client error: {0}")]
    Model(String),

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

pub type Result<T> = std::result::Result<T, AgentError>;
