//! Policy rules and the rule store.
//!
//! The store holds an ordered, append-only set of [`PolicyRule`]s and turns a
//! proposed tool call into a [`Decision`]. Evaluation is a pure function of
//! (rule set, tool name, serialized arguments, active mode): identical inputs
//! always yield the same decision.

use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

/// Baseline priority for rules loaded at startup.
pub const STATIC_RULE_PRIORITY: i32 = 70;

/// Priority for rules injected at runtime by privileged tools.
pub const DYNAMIC_RULE_PRIORITY: i32 = 80;

/// Named operating restrictions that gate which actions are permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Default mode. Full autonomy.
    Build,
    /// Restricted planning mode. Mutations only where a scoped grant allows them.
    Plan,
    /// Review mode. Analysis with limited mutations.
    Review,
}

impl Default for Mode {
    fn default() -> Self {
        Self::Build
    }
}

/// Tri-state outcome of evaluating the rule set against one proposed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny,
    AskUser,
}

/// Strategy for matching a rule against a proposed call's arguments.
///
/// `Serialized` is the legacy strategy: a regex searched within the flattened
/// text form of the arguments. It can false-positive when an unrelated field
/// contains the same text. `FieldPrefix` is the structured replacement: an
/// explicit field name compared by path prefix. Both coexist behind
/// [`ArgsPattern::matches`] so rules can migrate one at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArgsPattern {
    /// Matches any arguments.
    Any,
    /// Regex searched within the serialized argument text. An invalid
    /// pattern never matches.
    Serialized { pattern: String },
    /// The named argument field equals `path` or lies one or more levels
    /// beneath it.
    FieldPrefix { field: String, path: String },
}

impl ArgsPattern {
    /// Test this pattern against the serialized form of the call arguments.
    pub fn matches(&self, serialized_args: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Serialized { pattern } => Regex::new(pattern)
                .map(|re| re.is_match(serialized_args))
                .unwrap_or(false),
            Self::FieldPrefix { field, path } => field_prefix_matches(field, path, serialized_args),
        }
    }
}

/// Structured comparison: parse the arguments as JSON and compare the named
/// string field against `path`, accepting the exact path or anything nested
/// beneath it.
fn field_prefix_matches(field: &str, path: &str, serialized_args: &str) -> bool {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(serialized_args) else {
        return false;
    };
    let Some(candidate) = value.get(field).and_then(|v| v.as_str()) else {
        return false;
    };
    candidate == path
        || candidate
            .strip_prefix(path)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// A single policy rule. Immutable once added to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Tool this rule applies to (exact name).
    pub tool_name: String,
    /// Argument matching strategy.
    pub args_pattern: ArgsPattern,
    /// Decision produced when this rule wins.
    pub decision: Decision,
    /// Higher priority wins; equal priorities resolve most-recently-added.
    pub priority: i32,
    /// Modes in which this rule applies. Empty = all modes.
    pub modes: Vec<Mode>,
    /// Provenance tag ("startup", "plan_mode", "confirmation", ...).
    pub source: String,
    /// Assigned by the store on add; 0 until then.
    #[serde(default)]
    pub id: u64,
}

impl PolicyRule {
    /// A static-priority rule applying in all modes, tagged as loaded at startup.
    pub fn new(tool_name: &str, args_pattern: ArgsPattern, decision: Decision) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            args_pattern,
            decision,
            priority: STATIC_RULE_PRIORITY,
            modes: Vec::new(),
            source: "startup".to_string(),
            id: 0,
        }
    }
}

/// Process-wide, append-only rule store.
///
/// Shared across tool invocations and the browser loop via `Arc`. Rules are
/// only ever added; precedence between conflicting rules is resolved at
/// evaluation time, never on insert.
#[derive(Debug, Default)]
pub struct PolicyStore {
    rules: RwLock<Vec<PolicyRule>>,
    next_id: AtomicU64,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Append a rule and return its assigned id. Never validates for
    /// conflicts.
    pub fn add_rule(&self, mut rule: PolicyRule) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        rule.id = id;
        let mut rules = self.rules.write().unwrap_or_else(|e| e.into_inner());
        rules.push(rule);
        id
    }

    /// Evaluate a proposed call against the rule set.
    ///
    /// Rules are filtered by tool name and mode gate (an empty `modes` set
    /// applies in every mode), then by argument pattern; the highest-priority
    /// match wins. Ties between equal priorities resolve to the
    /// most-recently-added rule. No match yields [`Decision::AskUser`]: the
    /// default fails toward confirmation, never toward silent allow.
    pub fn evaluate(&self, tool_name: &str, serialized_args: &str, mode: Mode) -> Decision {
        let rules = self.rules.read().unwrap_or_else(|e| e.into_inner());
        let mut best: Option<&PolicyRule> = None;
        for rule in rules.iter() {
            if rule.tool_name != tool_name {
                continue;
            }
            if !rule.modes.is_empty() && !rule.modes.contains(&mode) {
                continue;
            }
            if !rule.args_pattern.matches(serialized_args) {
                continue;
            }
            // >= so a later rule displaces an equal-priority earlier one.
            if best.is_none_or(|b| rule.priority >= b.priority) {
                best = Some(rule);
            }
        }
        match best {
            Some(rule) => {
                if rule.decision == Decision::Deny {
                    tracing::debug!(
                        tool_name,
                        rule_id = rule.id,
                        source = %rule.source,
                        "policy denied tool call"
                    );
                }
                rule.decision
            }
            None => Decision::AskUser,
        }
    }

    /// Snapshot of the current rule set, for inspection and tests.
    pub fn rules(&self) -> Vec<PolicyRule> {
        self.rules
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.rules.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared current-mode cell, consulted at evaluation time and switched by the
/// mode-switch tool.
#[derive(Debug, Default)]
pub struct ModeState {
    current: RwLock<Mode>,
}

impl ModeState {
    pub fn new(mode: Mode) -> Self {
        Self {
            current: RwLock::new(mode),
        }
    }

    pub fn current(&self) -> Mode {
        *self.current.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Switch to `mode`, returning the previous mode.
    pub fn switch(&self, mode: Mode) -> Mode {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *current, mode)
    }
}
