//! Interactive approval workflow.
//!
//! A small state machine run for one unmatched approval key:
//!
//! ```text
//! AskApproval ──approve once──────────────────────────────▶ Approved (nothing stored)
//!     │ approve persistently
//!     ▼
//! AskScope ──▶ AskPattern ──▶ Committed ──────────────────▶ Approved (rule stored)
//!
//! AskApproval ──deny / deny with feedback──▶ Abandoned ───▶ Denied(reason)
//! ```

use thiserror::Error;

use crate::command::CommandSegment;
use crate::persistence::{PolicyError, PolicyStore};

use super::rule::{ApprovalRule, Scope};
use super::state::ApprovalState;
use super::ui::{ApprovalUi, PromptOptions, UiError};
use super::Decision;

pub const APPROVE_ONCE: &str = "Approve once";
pub const APPROVE_PERSISTENT: &str = "Approve persistently";
pub const DENY: &str = "Deny";
pub const DENY_WITH_FEEDBACK: &str = "Deny with feedback";

pub const SCOPE_GLOBAL: &str = "Global";
pub const SCOPE_SESSION: &str = "Session";

/// Reason attached to a plain human denial.
pub const USER_DENIED: &str = "denied by user";

#[derive(Error, Debug)]
pub enum ApprovalError {
    #[error("Approval storage failed: {0}")]
    Policy(#[from] PolicyError),

    #[error("Approval prompt failed: {0}")]
    Ui(#[from] UiError),
}

/// One approval key awaiting a human decision, with every segment of the
/// chain that shares it.
#[derive(Debug, Clone)]
pub struct ApprovalRequest<'a> {
    pub key: &'a str,
    pub segments: Vec<&'a CommandSegment>,
    pub description: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    AskApproval,
    AskScope,
    AskPattern(Scope),
    Committed(Scope, ApprovalRule),
    Abandoned(String),
}

/// Result of reading the pattern answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternChoice {
    Rule(ApprovalRule),
    /// Regex input was unusable; a prefix rule is used instead.
    Fallback { rule: ApprovalRule, error: String },
}

impl PatternChoice {
    pub fn into_rule(self) -> ApprovalRule {
        match self {
            PatternChoice::Rule(rule) | PatternChoice::Fallback { rule, .. } => rule,
        }
    }
}

/// Interpret the human's pattern answer.
///
/// Plain text is a prefix rule; `/.../` is a regex over the full rendered
/// command. A blank answer accepts `default`. Empty or invalid regex input
/// degrades to a prefix rule of the text without its slashes (or `default`
/// if nothing is left).
pub fn parse_pattern(input: &str, default: &str) -> PatternChoice {
    let input = input.trim();
    if input.is_empty() {
        return PatternChoice::Rule(ApprovalRule::prefix(default));
    }

    let is_regex = input.len() >= 2 && input.starts_with('/') && input.ends_with('/');
    if !is_regex {
        return PatternChoice::Rule(ApprovalRule::prefix(input));
    }

    let inner = &input[1..input.len() - 1];
    if inner.trim().is_empty() {
        return PatternChoice::Fallback {
            rule: ApprovalRule::prefix(default),
            error: "empty regular expression".to_string(),
        };
    }

    match ApprovalRule::regex(inner) {
        Ok(rule) => PatternChoice::Rule(rule),
        Err(e) => PatternChoice::Fallback {
            rule: ApprovalRule::prefix(inner.trim()),
            error: e.to_string(),
        },
    }
}

/// Store a rule in its scope. Session rules go into the returned state;
/// durable rules go to disk and leave the state as it was.
pub fn commit_rule(
    store: &PolicyStore,
    state: ApprovalState,
    scope: &Scope,
    rule: ApprovalRule,
) -> Result<ApprovalState, PolicyError> {
    match scope {
        Scope::Session => Ok(state.with_rule(rule)),
        Scope::Global | Scope::Project(_) => {
            store.insert(scope, &rule)?;
            Ok(state)
        }
    }
}

pub struct ApprovalWorkflow<'a> {
    store: &'a PolicyStore,
    project: Option<&'a str>,
}

impl<'a> ApprovalWorkflow<'a> {
    pub fn new(store: &'a PolicyStore, project: Option<&'a str>) -> Self {
        Self { store, project }
    }

    /// Drive the state machine to a decision.
    pub fn run(
        &self,
        ui: &mut dyn ApprovalUi,
        state: ApprovalState,
        request: &ApprovalRequest<'_>,
    ) -> Result<(Decision, ApprovalState), ApprovalError> {
        let mut step = Step::AskApproval;
        loop {
            step = match step {
                Step::AskApproval => match self.ask_approval(ui, request)? {
                    Some(next) => next,
                    None => {
                        log::info!("Approved once: {}", request.key);
                        return Ok((Decision::Approved, state));
                    }
                },
                Step::AskScope => Step::AskPattern(self.ask_scope(ui)?),
                Step::AskPattern(scope) => {
                    let rule = self.ask_pattern(ui, request)?;
                    Step::Committed(scope, rule)
                }
                Step::Committed(scope, rule) => {
                    log::info!("Approving {rule} in {scope} scope");
                    let state = commit_rule(self.store, state, &scope, rule)?;
                    return Ok((Decision::Approved, state));
                }
                Step::Abandoned(reason) => {
                    log::info!("Approval for '{}' abandoned: {reason}", request.key);
                    return Ok((Decision::Denied(reason), state));
                }
            };
        }
    }

    /// Returns `None` for a one-off approval.
    fn ask_approval(
        &self,
        ui: &mut dyn ApprovalUi,
        request: &ApprovalRequest<'_>,
    ) -> Result<Option<Step>, UiError> {
        let commands = request
            .segments
            .iter()
            .map(|s| format!("  {}", s.render()))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "{}\nThe agent wants to run:\n{commands}\nApprove '{}'?",
            request.description, request.key
        );
        let options = [APPROVE_ONCE, APPROVE_PERSISTENT, DENY, DENY_WITH_FEEDBACK]
            .map(String::from)
            .to_vec();

        let choice = ui.choose(&prompt, &options)?;
        match choice.as_str() {
            APPROVE_ONCE => Ok(None),
            APPROVE_PERSISTENT => Ok(Some(Step::AskScope)),
            DENY => Ok(Some(Step::Abandoned(USER_DENIED.to_string()))),
            DENY_WITH_FEEDBACK => {
                let feedback = ui.prompt_text(
                    "Feedback for the agent",
                    &PromptOptions {
                        optional: true,
                        default: None,
                    },
                )?;
                let feedback = feedback.trim();
                let reason = if feedback.is_empty() {
                    USER_DENIED.to_string()
                } else {
                    format!("{USER_DENIED}: {feedback}")
                };
                Ok(Some(Step::Abandoned(reason)))
            }
            _ => Err(UiError::UnexpectedChoice(choice)),
        }
    }

    fn ask_scope(&self, ui: &mut dyn ApprovalUi) -> Result<Scope, UiError> {
        let project_label = self.project.map(project_option);

        let mut options = vec![SCOPE_GLOBAL.to_string()];
        if let Some(label) = &project_label {
            options.push(label.clone());
        }
        options.push(SCOPE_SESSION.to_string());

        let choice = ui.choose("Remember this approval where?", &options)?;
        match (choice.as_str(), self.project) {
            (SCOPE_GLOBAL, _) => Ok(Scope::Global),
            (SCOPE_SESSION, _) => Ok(Scope::Session),
            (other, Some(project)) if Some(other) == project_label.as_deref() => {
                Ok(Scope::Project(project.to_string()))
            }
            _ => Err(UiError::UnexpectedChoice(choice)),
        }
    }

    fn ask_pattern(
        &self,
        ui: &mut dyn ApprovalUi,
        request: &ApprovalRequest<'_>,
    ) -> Result<ApprovalRule, UiError> {
        let input = ui.prompt_text(
            "Approval pattern (prefix, or /regex/ matched against the full command)",
            &PromptOptions {
                optional: true,
                default: Some(request.key.to_string()),
            },
        )?;

        match parse_pattern(&input, request.key) {
            PatternChoice::Rule(rule) => {
                if matches!(rule, ApprovalRule::Regex { .. })
                    && !request.segments.iter().any(|s| rule.matches(s))
                {
                    ui.notify(&format!("Note: {rule} does not match the current command"));
                }
                Ok(rule)
            }
            PatternChoice::Fallback { rule, error } => {
                ui.notify(&format!(
                    "Invalid regular expression ({error}); saving prefix '{}' instead",
                    rule.text()
                ));
                Ok(rule)
            }
        }
    }
}

/// Menu label for the project scope option.
pub fn project_option(project: &str) -> String {
    format!("Project ({project})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::ui::scripted::ScriptedUi;
    use crate::approval::RuleKind;
    use std::fs;
    use tempfile::tempdir;

    fn request<'a>(segment: &'a CommandSegment, key: &'a str) -> ApprovalRequest<'a> {
        ApprovalRequest {
            key,
            segments: vec![segment],
            description: "run the tests",
        }
    }

    fn mix_test() -> CommandSegment {
        CommandSegment::from_argv("mix", &["test"])
    }

    // ------------------------------------------------------------------------
    // Pattern parsing
    // ------------------------------------------------------------------------

    mod patterns {
        use super::*;

        #[test]
        fn blank_accepts_default() {
            assert_eq!(
                parse_pattern("  ", "mix test"),
                PatternChoice::Rule(ApprovalRule::prefix("mix test"))
            );
        }

        #[test]
        fn plain_text_is_prefix() {
            assert_eq!(
                parse_pattern("mix", "mix test"),
                PatternChoice::Rule(ApprovalRule::prefix("mix"))
            );
        }

        #[test]
        fn slashes_make_regex() {
            let choice = parse_pattern("/^mix test( --trace)?$/", "mix test");
            assert_eq!(
                choice,
                PatternChoice::Rule(ApprovalRule::regex("^mix test( --trace)?$").unwrap())
            );
        }

        #[test]
        fn empty_regex_falls_back_to_default() {
            match parse_pattern("//", "mix test") {
                PatternChoice::Fallback { rule, .. } => {
                    assert_eq!(rule, ApprovalRule::prefix("mix test"))
                }
                other => panic!("expected fallback, got {other:?}"),
            }
        }

        #[test]
        fn invalid_regex_falls_back_to_stripped_text() {
            match parse_pattern("/[invalid/", "mix test") {
                PatternChoice::Fallback { rule, error } => {
                    assert_eq!(rule, ApprovalRule::prefix("[invalid"));
                    assert!(!error.is_empty());
                }
                other => panic!("expected fallback, got {other:?}"),
            }
        }

        #[test]
        fn lone_slash_is_a_prefix() {
            assert_eq!(
                parse_pattern("/", "ls"),
                PatternChoice::Rule(ApprovalRule::prefix("/"))
            );
        }
    }

    // ------------------------------------------------------------------------
    // State machine
    // ------------------------------------------------------------------------

    #[test]
    fn approve_once_stores_nothing() {
        let dir = tempdir().unwrap();
        let store = PolicyStore::new(dir.path());
        let workflow = ApprovalWorkflow::new(&store, None);
        let mut ui = ScriptedUi::new(&[APPROVE_ONCE]);
        let segment = mix_test();

        let (decision, state) = workflow
            .run(&mut ui, ApprovalState::new(), &request(&segment, "mix test"))
            .unwrap();

        assert_eq!(decision, Decision::Approved);
        assert!(state.is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn deny_leaves_storage_untouched() {
        let dir = tempdir().unwrap();
        let store = PolicyStore::new(dir.path());
        fs::write(store.path(), "{\"keep\": true}\n").unwrap();
        let workflow = ApprovalWorkflow::new(&store, None);
        let mut ui = ScriptedUi::new(&[DENY]);
        let segment = mix_test();

        let (decision, state) = workflow
            .run(&mut ui, ApprovalState::new(), &request(&segment, "mix test"))
            .unwrap();

        assert_eq!(decision, Decision::Denied(USER_DENIED.to_string()));
        assert!(state.is_empty());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "{\"keep\": true}\n");
    }

    #[test]
    fn deny_with_feedback_includes_text() {
        let dir = tempdir().unwrap();
        let store = PolicyStore::new(dir.path());
        let workflow = ApprovalWorkflow::new(&store, None);
        let mut ui = ScriptedUi::new(&[DENY_WITH_FEEDBACK, "use mix test --failed"]);
        let segment = mix_test();

        let (decision, _) = workflow
            .run(&mut ui, ApprovalState::new(), &request(&segment, "mix test"))
            .unwrap();

        assert_eq!(
            decision,
            Decision::Denied("denied by user: use mix test --failed".to_string())
        );
    }

    #[test]
    fn persistent_global_with_default_pattern() {
        let dir = tempdir().unwrap();
        let store = PolicyStore::new(dir.path());
        let workflow = ApprovalWorkflow::new(&store, None);
        let mut ui = ScriptedUi::new(&[APPROVE_PERSISTENT, SCOPE_GLOBAL, ""]);
        let segment = mix_test();

        let (decision, state) = workflow
            .run(&mut ui, ApprovalState::new(), &request(&segment, "mix test"))
            .unwrap();

        assert_eq!(decision, Decision::Approved);
        assert!(state.is_empty());
        assert!(store.snapshot().unwrap().global.shell.contains("mix test"));
    }

    #[test]
    fn persistent_session_only_updates_state() {
        let dir = tempdir().unwrap();
        let store = PolicyStore::new(dir.path());
        let workflow = ApprovalWorkflow::new(&store, Some("fnord"));
        let mut ui = ScriptedUi::new(&[APPROVE_PERSISTENT, SCOPE_SESSION, "mix"]);
        let segment = mix_test();

        let (decision, state) = workflow
            .run(&mut ui, ApprovalState::new(), &request(&segment, "mix test"))
            .unwrap();

        assert_eq!(decision, Decision::Approved);
        assert!(state.contains(&ApprovalRule::prefix("mix")));
        assert!(!store.path().exists());
    }

    #[test]
    fn project_scope_offered_only_with_active_project() {
        let dir = tempdir().unwrap();
        let store = PolicyStore::new(dir.path());
        let segment = mix_test();

        let mut ui = ScriptedUi::new(&[APPROVE_PERSISTENT, SCOPE_SESSION, ""]);
        ApprovalWorkflow::new(&store, None)
            .run(&mut ui, ApprovalState::new(), &request(&segment, "mix test"))
            .unwrap();
        assert_eq!(ui.offered[1], vec![SCOPE_GLOBAL, SCOPE_SESSION]);

        let mut ui = ScriptedUi::new(&[APPROVE_PERSISTENT, "Project (fnord)", ""]);
        ApprovalWorkflow::new(&store, Some("fnord"))
            .run(&mut ui, ApprovalState::new(), &request(&segment, "mix test"))
            .unwrap();
        assert_eq!(
            ui.offered[1],
            vec![SCOPE_GLOBAL, "Project (fnord)", SCOPE_SESSION]
        );
        assert!(store.snapshot().unwrap().projects["fnord"]
            .shell
            .contains("mix test"));
    }

    #[test]
    fn project_choice_without_project_is_rejected() {
        let dir = tempdir().unwrap();
        let store = PolicyStore::new(dir.path());
        let mut ui = ScriptedUi::new(&[APPROVE_PERSISTENT, "Project (fnord)"]);
        let segment = mix_test();

        let result = ApprovalWorkflow::new(&store, None).run(
            &mut ui,
            ApprovalState::new(),
            &request(&segment, "mix test"),
        );
        assert!(matches!(
            result,
            Err(ApprovalError::Ui(UiError::UnexpectedChoice(_)))
        ));
    }

    #[test]
    fn regex_pattern_is_stored_as_full_rule() {
        let dir = tempdir().unwrap();
        let store = PolicyStore::new(dir.path());
        let mut ui = ScriptedUi::new(&[APPROVE_PERSISTENT, SCOPE_GLOBAL, "/^mix test/"]);
        let segment = mix_test();

        ApprovalWorkflow::new(&store, None)
            .run(&mut ui, ApprovalState::new(), &request(&segment, "mix test"))
            .unwrap();

        let snapshot = store.snapshot().unwrap();
        assert!(snapshot.global.shell_full.contains("^mix test"));
        assert!(snapshot.global.shell.is_empty());
        assert!(ui.notices.is_empty());
    }

    #[test]
    fn invalid_regex_falls_back_and_still_approves() {
        let dir = tempdir().unwrap();
        let store = PolicyStore::new(dir.path());
        let segment = mix_test();

        for input in ["/[invalid/", "//"] {
            let mut ui = ScriptedUi::new(&[APPROVE_PERSISTENT, SCOPE_GLOBAL, input]);
            let (decision, _) = ApprovalWorkflow::new(&store, None)
                .run(&mut ui, ApprovalState::new(), &request(&segment, "mix test"))
                .unwrap();
            assert_eq!(decision, Decision::Approved);
            assert_eq!(ui.notices.len(), 1);
        }

        let snapshot = store.snapshot().unwrap();
        assert!(snapshot.global.shell_full.is_empty());
        assert!(snapshot.global.shell.contains("[invalid"));
        assert!(snapshot.global.shell.contains("mix test"));
        assert_eq!(
            store.snapshot().unwrap().global.get(RuleKind::Regex).len(),
            0
        );
    }

    #[test]
    fn regex_that_misses_current_command_warns() {
        let dir = tempdir().unwrap();
        let store = PolicyStore::new(dir.path());
        let mut ui = ScriptedUi::new(&[APPROVE_PERSISTENT, SCOPE_SESSION, "/^cargo/"]);
        let segment = mix_test();

        let (decision, state) = ApprovalWorkflow::new(&store, None)
            .run(&mut ui, ApprovalState::new(), &request(&segment, "mix test"))
            .unwrap();

        assert_eq!(decision, Decision::Approved);
        assert_eq!(state.len(), 1);
        assert_eq!(ui.notices.len(), 1);
    }

    #[test]
    fn unexpected_choice_fails_closed() {
        let dir = tempdir().unwrap();
        let store = PolicyStore::new(dir.path());
        let mut ui = ScriptedUi::new(&["Yolo"]);
        let segment = mix_test();

        let result = ApprovalWorkflow::new(&store, None).run(
            &mut ui,
            ApprovalState::new(),
            &request(&segment, "mix test"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn prompt_lists_every_command_for_the_key() {
        let dir = tempdir().unwrap();
        let store = PolicyStore::new(dir.path());
        let mut ui = ScriptedUi::new(&[APPROVE_ONCE]);
        let a = mix_test();
        let b = CommandSegment::from_argv("mix", &["test", "--trace"]);
        let req = ApprovalRequest {
            key: "mix test",
            segments: vec![&a, &b],
            description: "tests",
        };

        ApprovalWorkflow::new(&store, None)
            .run(&mut ui, ApprovalState::new(), &req)
            .unwrap();

        assert!(ui.prompts[0].contains("  mix test\n"));
        assert!(ui.prompts[0].contains("  mix test --trace"));
    }
}
