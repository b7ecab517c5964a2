//! In-memory audit trail of policy decisions and confirmation outcomes.
//!
//! The buffer is capped; an optional sink mirrors entries to external
//! storage. Sink failures go to the diagnostic channel only and never
//! interrupt the primary control flow.

use chrono::Utc;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::rules::Decision;

/// A single audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    /// Tool or action the decision was about.
    pub tool_name: String,
    /// Decision or confirmation outcome, in its serialized form.
    pub decision: String,
    /// Redacted detail text (serialized arguments, prompt, ...).
    pub details: Option<String>,
    /// RFC3339 timestamp.
    pub timestamp: String,
    /// Whether redaction replaced anything in `details`.
    pub redacted: bool,
}

/// Mirror target for audit entries (file, socket, ...).
pub trait AuditSink: Send + Sync {
    fn append(&self, entry: &AuditEntry) -> std::io::Result<()>;
}

/// Patterns for content that must not land in the audit trail verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionPolicy {
    pub patterns: Vec<String>,
    pub replacement: String,
}

impl Default for RedactionPolicy {
    fn default() -> Self {
        Self {
            patterns: vec![
                r"(?i)(api[_-]?key|secret|token|password)\s*[=:]\s*\S+".into(),
                r"Bearer\s+[a-zA-Z0-9._-]+".into(),
            ],
            replacement: "[REDACTED]".into(),
        }
    }
}

impl RedactionPolicy {
    /// Apply all patterns to `text`. Returns the redacted text and whether
    /// anything was replaced. Invalid patterns are skipped.
    fn apply(&self, text: &str) -> (String, bool) {
        let mut out = text.to_string();
        let mut redacted = false;
        for pattern in &self.patterns {
            if let Ok(re) = Regex::new(pattern) {
                if re.is_match(&out) {
                    out = re.replace_all(&out, self.replacement.as_str()).into_owned();
                    redacted = true;
                }
            }
        }
        (out, redacted)
    }
}

/// Capped audit buffer with redaction and an optional mirror sink.
#[derive(Default)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
    max_entries: usize,
    redaction: RedactionPolicy,
    sink: Option<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("entries", &self.entries.len())
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}

impl AuditLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries,
            redaction: RedactionPolicy::default(),
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Record a policy decision.
    pub fn record_decision(&mut self, tool_name: &str, decision: Decision, details: Option<&str>) {
        let decision = match decision {
            Decision::Allow => "allow",
            Decision::Deny => "deny",
            Decision::AskUser => "ask_user",
        };
        self.record(tool_name, decision, details);
    }

    /// Record an arbitrary decision string (confirmation outcomes, grants).
    pub fn record(&mut self, tool_name: &str, decision: &str, details: Option<&str>) {
        let (details, redacted) = match details {
            Some(text) => {
                let (clean, redacted) = self.redaction.apply(text);
                (Some(clean), redacted)
            }
            None => (None, false),
        };
        let entry = AuditEntry {
            id: format!("audit-{}", self.entries.len() + 1),
            tool_name: tool_name.to_string(),
            decision: decision.to_string(),
            details,
            timestamp: Utc::now().to_rfc3339(),
            redacted,
        };
        if let Some(sink) = &self.sink {
            // Sink failures are diagnostic-only; the decision itself already
            // happened and must not be disturbed.
            if let Err(err) = sink.append(&entry) {
                tracing::warn!(%err, "audit sink write failed");
            }
        }
        self.entries.push(entry);
        if self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
