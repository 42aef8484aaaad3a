//! Session approval state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::command::CommandSegment;

use super::rule::ApprovalRule;

/// Session-scoped approvals, threaded through every resolve call.
///
/// One value per conversation. It is passed in and handed back rather than
/// shared, so a caller that drops it forgets every session approval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalState {
    /// Rules approved for the rest of this session.
    pub session: BTreeSet<ApprovalRule>,
}

impl ApprovalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a new state with `rule` added. Re-adding an existing rule
    /// yields an identical state.
    pub fn with_rule(mut self, rule: ApprovalRule) -> Self {
        self.session.insert(rule);
        self
    }

    /// Check if any session rule covers the segment.
    pub fn matches(&self, segment: &CommandSegment) -> bool {
        self.session.iter().any(|rule| rule.matches(segment))
    }

    pub fn contains(&self, rule: &ApprovalRule) -> bool {
        self.session.contains(rule)
    }

    pub fn len(&self) -> usize {
        self.session.len()
    }

    pub fn is_empty(&self) -> bool {
        self.session.is_empty()
    }
}
