//! Chain resolution: gate, then policy, then the human.

use std::collections::HashMap;

use crate::command::{CommandChain, CommandSegment};
use crate::logging::{log_line, LogHandle};
use crate::persistence::{PolicySnapshot, PolicyStore};

use super::gate::{check_segment, GateOutcome};
use super::prefix::extract_key;
use super::state::ApprovalState;
use super::ui::ApprovalUi;
use super::workflow::{ApprovalError, ApprovalRequest, ApprovalWorkflow};
use super::Decision;

/// Decision for a chain plus the state to carry into the next call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub decision: Decision,
    pub state: ApprovalState,
}

impl Resolution {
    fn new(decision: Decision, state: ApprovalState) -> Self {
        Self { decision, state }
    }
}

/// Decides whether command chains may run.
pub struct Resolver {
    store: PolicyStore,
    project: Option<String>,
    decision_log: Option<LogHandle>,
}

impl Resolver {
    pub fn new(store: PolicyStore, project: Option<String>) -> Self {
        Self {
            store,
            project,
            decision_log: None,
        }
    }

    /// Append every decision to a log file.
    pub fn with_decision_log(mut self, handle: LogHandle) -> Self {
        self.decision_log = Some(handle);
        self
    }

    pub fn store(&self) -> &PolicyStore {
        &self.store
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// Resolve a chain to Approved or Denied.
    ///
    /// Storage and UI failures come back as errors; callers must treat them
    /// as "not approved".
    pub fn resolve(
        &self,
        ui: &mut dyn ApprovalUi,
        state: ApprovalState,
        chain: &CommandChain,
    ) -> Result<Resolution, ApprovalError> {
        let resolution = self.evaluate(ui, state, chain)?;

        if let Some(handle) = &self.decision_log {
            let line = match &resolution.decision {
                Decision::Approved => chain.render(),
                Decision::Denied(reason) => format!("{} ({reason})", chain.render()),
            };
            log_line(handle, resolution.decision.label(), &line);
        }
        Ok(resolution)
    }

    fn evaluate(
        &self,
        ui: &mut dyn ApprovalUi,
        state: ApprovalState,
        chain: &CommandChain,
    ) -> Result<Resolution, ApprovalError> {
        if chain.segments.is_empty() {
            return Ok(Resolution::new(
                Decision::Denied("empty command chain".to_string()),
                state,
            ));
        }

        for segment in &chain.segments {
            if let GateOutcome::Deny(reason) = check_segment(segment) {
                log::warn!("Security gate denied '{}': {reason}", segment.render());
                return Ok(Resolution::new(Decision::Denied(reason), state));
            }
        }

        let snapshot = self.store.snapshot()?;
        let unmatched: Vec<&CommandSegment> = chain
            .segments
            .iter()
            .filter(|s| !self.covered(&state, &snapshot, s))
            .collect();

        if unmatched.is_empty() {
            log::debug!("All segments pre-approved: {}", chain.render());
            return Ok(Resolution::new(Decision::Approved, state));
        }

        let workflow = ApprovalWorkflow::new(&self.store, self.project.as_deref());
        let mut state = state;

        for (key, segments) in group_by_key(&unmatched) {
            // An approval granted earlier in this call may already cover it.
            let snapshot = self.store.snapshot()?;
            if segments.iter().all(|s| self.covered(&state, &snapshot, s)) {
                continue;
            }

            let request = ApprovalRequest {
                key: &key,
                segments,
                description: &chain.description,
            };
            let (decision, next) = workflow.run(ui, state, &request)?;
            state = next;

            if let Decision::Denied(reason) = decision {
                return Ok(Resolution::new(Decision::Denied(reason), state));
            }
        }

        Ok(Resolution::new(Decision::Approved, state))
    }

    /// Session, global and active-project rules, any of which suffices.
    fn covered(
        &self,
        state: &ApprovalState,
        snapshot: &PolicySnapshot,
        segment: &CommandSegment,
    ) -> bool {
        state.matches(segment) || snapshot.covers(self.project.as_deref(), segment)
    }
}

/// Group segments by approval key, keeping first-seen order.
fn group_by_key<'a>(segments: &[&'a CommandSegment]) -> Vec<(String, Vec<&'a CommandSegment>)> {
    let mut order: Vec<(String, Vec<&'a CommandSegment>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for segment in segments {
        let key = extract_key(segment);
        match index.get(&key) {
            Some(&i) => order[i].1.push(segment),
            None => {
                index.insert(key.clone(), order.len());
                order.push((key, vec![segment]));
            }
        }
    }
    order
}
