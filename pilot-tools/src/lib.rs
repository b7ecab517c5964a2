pub mod files;
pub mod invocation;
pub mod plan_mode;

// Re-export key types for convenience.
pub use files::{EditFileParams, EditFileTool, WriteFileParams, WriteFileTool};
pub use invocation::{ToolError, ToolErrorKind, ToolInvocation, ToolOutcome};
pub use plan_mode::{EnterPlanModeTool, PlanModeParams};
