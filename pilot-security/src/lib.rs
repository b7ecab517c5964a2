pub mod audit;
pub mod confirm;
pub mod error;
pub mod grant;
pub mod rules;

// Re-export key types for convenience.
pub use audit::{AuditEntry, AuditLog, AuditSink, RedactionPolicy};
pub use confirm::{
    Confirmation, ConfirmationMediator, ConfirmationOutcome, ConfirmationRequest,
    ConfirmationResolver, ConfirmationTicket,
};
pub use error::{Result, SecurityError};
pub use grant::{DEFAULT_WRITE_TOOLS, PathAccessValidator, grant_scoped_write, scoped_write_pattern};
pub use rules::{
    ArgsPattern, DYNAMIC_RULE_PRIORITY, Decision, Mode, ModeState, PolicyRule, PolicyStore,
    STATIC_RULE_PRIORITY,
};
