//! Persistence data types.
//!
//! # Document Layout
//!
//! Approvals live in `settings.json` under the `approvals` key. Everything
//! else in the document belongs to other parts of the application and is
//! carried through untouched.
//!
//! ```json
//! {
//!   "approvals": {
//!     "global": { "shell": ["git status"], "shell_full": ["^ls( -la)?$"] },
//!     "projects": {
//!       "fnord": { "shell": ["mix test"], "shell_full": [] }
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::approval::{ApprovalRule, RuleKind, Scope};
use crate::command::CommandSegment;

/// Top-level key owned by the approval engine.
pub const APPROVALS_KEY: &str = "approvals";

/// The two rule sets of one durable scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRules {
    /// Prefix rules.
    #[serde(default)]
    pub shell: BTreeSet<String>,

    /// Regex rule sources.
    #[serde(default)]
    pub shell_full: BTreeSet<String>,
}

impl ScopeRules {
    pub fn get(&self, kind: RuleKind) -> &BTreeSet<String> {
        match kind {
            RuleKind::Prefix => &self.shell,
            RuleKind::Regex => &self.shell_full,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shell.is_empty() && self.shell_full.is_empty()
    }

    /// Materialise rules. Regex sources that no longer compile are skipped
    /// with a warning rather than failing every lookup.
    pub fn rules(&self) -> Vec<ApprovalRule> {
        let mut rules: Vec<ApprovalRule> =
            self.shell.iter().cloned().map(ApprovalRule::Prefix).collect();
        for source in &self.shell_full {
            match ApprovalRule::regex(source.as_str()) {
                Ok(rule) => rules.push(rule),
                Err(e) => log::warn!("Ignoring stored regex approval /{source}/: {e}"),
            }
        }
        rules
    }
}

/// Typed view of the durable approvals, read fresh from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    #[serde(default)]
    pub global: ScopeRules,

    #[serde(default)]
    pub projects: BTreeMap<String, ScopeRules>,
}

impl PolicySnapshot {
    /// Rules of a durable scope. Session and unknown projects are empty.
    pub fn scope(&self, scope: &Scope) -> Option<&ScopeRules> {
        match scope {
            Scope::Global => Some(&self.global),
            Scope::Project(name) => self.projects.get(name),
            Scope::Session => None,
        }
    }

    /// Check the global scope and, when a project is active, its scope.
    pub fn covers(&self, project: Option<&str>, segment: &CommandSegment) -> bool {
        let global = self.global.rules().iter().any(|r| r.matches(segment));
        if global {
            return true;
        }
        project
            .and_then(|name| self.projects.get(name))
            .is_some_and(|rules| rules.rules().iter().any(|r| r.matches(segment)))
    }
}
