//! Shell command approval.
//!
//! A chain is approved only when every segment passes:
//! - the security gate (shell re-invocation, unsafe `sed`)
//! - a session, global or project rule, or an interactive approval
//!
//! Rules are either token-boundary prefixes (`gh pr view`) or regexes
//! matched against the rendered segment.

mod families;
mod gate;
mod prefix;
mod resolver;
mod rule;
mod sed;
mod state;
pub mod ui;
pub mod workflow;

use std::fmt;

use serde::Serialize;

pub use families::family_depth;
pub use gate::{check_segment, GateOutcome, SHELLS, SHELL_INVOCATION_DENIED};
pub use prefix::{extract_key, prefix_covers};
pub use resolver::{Resolution, Resolver};
pub use rule::{ApprovalRule, RuleKind, Scope};
pub use state::ApprovalState;
pub use ui::{ApprovalUi, NonInteractiveUi, PromptOptions, UiError};
pub use workflow::{
    commit_rule, parse_pattern, ApprovalError, ApprovalRequest, ApprovalWorkflow, PatternChoice,
};

/// Outcome of resolving a command chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Denied(String),
}

impl Decision {
    pub fn is_approved(&self) -> bool {
        matches!(self, Decision::Approved)
    }

    pub fn is_denied(&self) -> bool {
        !self.is_approved()
    }

    /// Upper-case label used in the decision log.
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Approved => "APPROVED",
            Decision::Denied(_) => "DENIED",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Approved => write!(f, "approved"),
            Decision::Denied(reason) => write!(f, "denied: {reason}"),
        }
    }
}
