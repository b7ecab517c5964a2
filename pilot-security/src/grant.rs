//! Scoped write-access grants: dynamic rule injection used by privileged
//! tools at the moment a restricted mode is entered.

use std::path::{Path, PathBuf};

use crate::error::{Result, SecurityError};
use crate::rules::{ArgsPattern, DYNAMIC_RULE_PRIORITY, Decision, Mode, PolicyRule, PolicyStore};

/// The two tools that can mutate file content; the default grant allow-list.
pub const DEFAULT_WRITE_TOOLS: [&str; 2] = ["write_file", "edit_file"];

/// Seam for the external path-sandbox boundary check.
///
/// Returns an error message when the path must not be granted, `None`
/// otherwise. Assumed correct; this crate never re-validates.
pub trait PathAccessValidator: Send + Sync {
    fn validate(&self, absolute_path: &Path) -> Option<String>;
}

/// Serialized-args pattern matching the exact path and any path nested one or
/// more levels beneath it.
///
/// The pattern is searched within the flattened argument text, so it matches
/// `"file_path":"<path>"` as well as `"file_path":"<path>/nested/file"`. The
/// path is embedded literally (regex-escaped); whether the caller supplied it
/// relative or absolute, the pattern matches exactly the form it was built
/// from.
pub fn scoped_write_pattern(path: &str) -> String {
    format!("\"file_path\":\"{}(/.*)?\"", regex::escape(path))
}

/// Inject elevated-priority allow rules granting `tools` write access to
/// `path` (and anything beneath it) while in `mode`.
///
/// The path is resolved against `base_dir` when relative, then handed to the
/// validator; a validation error aborts with [`SecurityError::PathRejected`]
/// and injects nothing. Returns the ids of the injected rules. The caller is
/// responsible for switching the mode, and must do so only after this
/// succeeds.
pub fn grant_scoped_write(
    store: &PolicyStore,
    validator: &dyn PathAccessValidator,
    base_dir: &Path,
    path: &str,
    tools: &[String],
    mode: Mode,
    source: &str,
) -> Result<Vec<u64>> {
    let absolute: PathBuf = if Path::new(path).is_absolute() {
        PathBuf::from(path)
    } else {
        base_dir.join(path)
    };

    if let Some(message) = validator.validate(&absolute) {
        return Err(SecurityError::PathRejected(message));
    }

    let pattern = scoped_write_pattern(&absolute.to_string_lossy());
    let ids = tools
        .iter()
        .map(|tool| {
            store.add_rule(PolicyRule {
                tool_name: tool.clone(),
                args_pattern: ArgsPattern::Serialized {
                    pattern: pattern.clone(),
                },
                decision: Decision::Allow,
                priority: DYNAMIC_RULE_PRIORITY,
                modes: vec![mode],
                source: source.to_string(),
                id: 0,
            })
        })
        .collect();
    tracing::debug!(path = %absolute.display(), ?tools, ?mode, "injected scoped write rules");
    Ok(ids)
}
