/// Errors produced by browser driver operations.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("browser driver disconnected")]
    Disconnected,

    #[error("failed to launch browser driver: {0}")]
    Launch(String),

    #[error("driver error: {0}")]
    Driver(String),

    #[error("unknown or malformed action '{name}': {reason}")]
    MalformedAction { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, BrowserError>;
