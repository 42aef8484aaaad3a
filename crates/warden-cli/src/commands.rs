//! Handlers behind the `warden` subcommands.

use std::fs;
use std::path::Path;

use thiserror::Error;
use warden_core::approval::{ApprovalError, ApprovalRule, ApprovalUi, RuleKind, Scope};
use warden_core::command::{parse_chain, ParseError};
use warden_core::persistence::{PolicyError, PolicySnapshot, ScopeRules};
use warden_core::{ApprovalState, Decision, NonInteractiveUi, WardenContext};

use crate::cli::{ApprovalsCommand, CheckArgs, RuleArgs, ScopeArg};
use crate::terminal_ui::TerminalUi;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Cannot parse command: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Approval(#[from] ApprovalError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Usage(String),
}

/// Resolve a chain and report the decision.
pub fn check(ctx: &WardenContext, args: CheckArgs) -> Result<Decision, CliError> {
    let text = command_text(&args.command)?;
    let mut chain = parse_chain(&text)?;
    if let Some(description) = args.description {
        chain.description = description;
    }

    let state = match &args.state {
        Some(path) => load_state(path)?,
        None => ApprovalState::new(),
    };

    let mut terminal = TerminalUi::new();
    let mut fallback = NonInteractiveUi;
    let ui: &mut dyn ApprovalUi = if args.no_prompt || !terminal.is_interactive() {
        &mut fallback
    } else {
        &mut terminal
    };

    let resolution = ctx.resolver().resolve(ui, state, &chain)?;

    if let Some(path) = &args.state {
        save_state(path, &resolution.state)?;
    }

    if args.json {
        let mut out = serde_json::to_value(&resolution.decision)?;
        out["command"] = serde_json::Value::String(chain.render());
        println!("{}", serde_json::to_string(&out)?);
    } else {
        println!("{}", resolution.decision);
    }
    Ok(resolution.decision)
}

pub fn approvals(ctx: &WardenContext, command: ApprovalsCommand) -> Result<(), CliError> {
    match command {
        ApprovalsCommand::List { json } => {
            let snapshot = ctx.store().snapshot()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print!("{}", render_snapshot(&snapshot));
            }
        }
        ApprovalsCommand::Add(args) => {
            let scope = scope_for(args.scope, ctx.project())?;
            let rule = rule_for(&args)?;
            if ctx.store().insert(&scope, &rule)? {
                println!("Added {rule} to {scope} approvals");
            } else {
                println!("{rule} is already approved in {scope} scope");
            }
        }
        ApprovalsCommand::Remove(args) => {
            let scope = scope_for(args.scope, ctx.project())?;
            let kind = if args.regex {
                RuleKind::Regex
            } else {
                RuleKind::Prefix
            };
            if ctx.store().remove(&scope, kind, args.pattern.trim())? {
                println!("Removed '{}' from {scope} approvals", args.pattern.trim());
            } else {
                return Err(CliError::Usage(format!(
                    "'{}' is not in {scope} approvals",
                    args.pattern.trim()
                )));
            }
        }
    }
    Ok(())
}

/// A single argument is the chain itself; several are re-quoted words.
fn command_text(words: &[String]) -> Result<String, CliError> {
    match words {
        [single] => Ok(single.clone()),
        _ => shlex::try_join(words.iter().map(String::as_str))
            .map_err(|e| CliError::Usage(format!("Cannot quote command: {e}"))),
    }
}

fn scope_for(scope: ScopeArg, project: Option<&str>) -> Result<Scope, CliError> {
    match (scope, project) {
        (ScopeArg::Global, _) => Ok(Scope::Global),
        (ScopeArg::Project, Some(name)) => Ok(Scope::Project(name.to_string())),
        (ScopeArg::Project, None) => Err(CliError::Usage(
            "Project scope needs --project or WARDEN_PROJECT".to_string(),
        )),
    }
}

fn rule_for(args: &RuleArgs) -> Result<ApprovalRule, CliError> {
    let pattern = args.pattern.trim();
    if pattern.is_empty() {
        return Err(CliError::Usage("Pattern must not be empty".to_string()));
    }
    if args.regex {
        ApprovalRule::regex(pattern)
            .map_err(|e| CliError::Usage(format!("Invalid regular expression: {e}")))
    } else {
        Ok(ApprovalRule::prefix(pattern))
    }
}

fn load_state(path: &Path) -> Result<ApprovalState, CliError> {
    match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(ApprovalState::new()),
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ApprovalState::new()),
        Err(e) => Err(e.into()),
    }
}

fn save_state(path: &Path, state: &ApprovalState) -> Result<(), CliError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, serde_json::to_string_pretty(state)?)?;
    Ok(())
}

fn render_snapshot(snapshot: &PolicySnapshot) -> String {
    let mut out = String::new();
    render_scope(&mut out, "global", &snapshot.global);
    for (name, rules) in &snapshot.projects {
        render_scope(&mut out, &format!("project {name}"), rules);
    }
    out
}

fn render_scope(out: &mut String, title: &str, rules: &ScopeRules) {
    out.push_str(title);
    out.push('\n');
    if rules.is_empty() {
        out.push_str("  (none)\n");
        return;
    }
    for prefix in &rules.shell {
        out.push_str(&format!("  prefix  {prefix}\n"));
    }
    for source in &rules.shell_full {
        out.push_str(&format!("  regex   /{source}/\n"));
    }
}
