//! Approval rules and scopes.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::command::CommandSegment;

use super::prefix::prefix_matches_segment;

/// Which of a scope's two rule sets a rule lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Prefix,
    Regex,
}

impl RuleKind {
    /// Array name used in the persisted document.
    pub fn storage_key(&self) -> &'static str {
        match self {
            RuleKind::Prefix => "shell",
            RuleKind::Regex => "shell_full",
        }
    }
}

/// A stored approval.
///
/// Prefix text and regex source are kept verbatim; they are never
/// re-derived from the command they were minted for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "StoredRule", into = "StoredRule")]
pub enum ApprovalRule {
    /// Matches when the segment's key or rendering starts with `text`
    /// (at a token boundary).
    Prefix(String),
    /// Matches when `compiled` finds a match in the full rendered command.
    Regex { source: String, compiled: Regex },
}

impl ApprovalRule {
    pub fn prefix(text: impl Into<String>) -> Self {
        ApprovalRule::Prefix(text.into())
    }

    /// Compile a regex rule.
    pub fn regex(source: impl Into<String>) -> Result<Self, regex::Error> {
        let source = source.into();
        let compiled = Regex::new(&source)?;
        Ok(ApprovalRule::Regex { source, compiled })
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            ApprovalRule::Prefix(_) => RuleKind::Prefix,
            ApprovalRule::Regex { .. } => RuleKind::Regex,
        }
    }

    /// The verbatim prefix text or regex source.
    pub fn text(&self) -> &str {
        match self {
            ApprovalRule::Prefix(text) => text,
            ApprovalRule::Regex { source, .. } => source,
        }
    }

    pub fn matches(&self, segment: &CommandSegment) -> bool {
        match self {
            ApprovalRule::Prefix(text) => prefix_matches_segment(text, segment),
            ApprovalRule::Regex { compiled, .. } => compiled.is_match(&segment.render()),
        }
    }
}

impl std::fmt::Display for ApprovalRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApprovalRule::Prefix(text) => write!(f, "{text}"),
            ApprovalRule::Regex { source, .. } => write!(f, "/{source}/"),
        }
    }
}

// Identity is (kind, text); the compiled regex is derived from the source.

impl PartialEq for ApprovalRule {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.text() == other.text()
    }
}

impl Eq for ApprovalRule {}

impl Hash for ApprovalRule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        self.text().hash(state);
    }
}

impl PartialOrd for ApprovalRule {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ApprovalRule {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.kind(), self.text()).cmp(&(other.kind(), other.text()))
    }
}

/// Serialized shape of a rule: `{"kind": "prefix", "text": "mix test"}`.
#[derive(Serialize, Deserialize)]
struct StoredRule {
    kind: RuleKind,
    text: String,
}

impl TryFrom<StoredRule> for ApprovalRule {
    type Error = regex::Error;

    fn try_from(stored: StoredRule) -> Result<Self, Self::Error> {
        match stored.kind {
            RuleKind::Prefix => Ok(ApprovalRule::Prefix(stored.text)),
            RuleKind::Regex => ApprovalRule::regex(stored.text),
        }
    }
}

impl From<ApprovalRule> for StoredRule {
    fn from(rule: ApprovalRule) -> Self {
        StoredRule {
            kind: rule.kind(),
            text: rule.text().to_string(),
        }
    }
}

/// Where an approval lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Durable, applies in every project.
    Global,
    /// Durable, applies only while the named project is active.
    Project(String),
    /// Held in the caller's [`ApprovalState`](super::ApprovalState); gone
    /// when the process exits.
    Session,
}

impl Scope {
    pub fn is_durable(&self) -> bool {
        !matches!(self, Scope::Session)
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Project(name) => write!(f, "project '{name}'"),
            Scope::Session => write!(f, "session"),
        }
    }
}
