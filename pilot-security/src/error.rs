/// Errors produced by security operations.
#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    /// A policy rule denied the proposed call. Raised before any state change.
    #[error("policy denied '{tool_name}': {reason}")]
    PolicyDenied { tool_name: String, reason: String },

    /// The path-sandbox collaborator rejected the target path.
    #[error("path access rejected: {0}")]
    PathRejected(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, SecurityError>;
